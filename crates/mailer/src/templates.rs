//! Tera templates for the quotation email, embedded at compile time so the
//! binary never depends on a template directory being deployed next to it.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tera::{Context, Tera};

use charterdesk_core::money::{format_long_date, format_money};

use crate::{DeliveryError, QuotationEmail};

pub const QUOTATION_HTML: &str = "quotation.html.tera";
pub const QUOTATION_TEXT: &str = "quotation.txt.tera";

/// Both renderings of one message plus the subject line that goes with them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

pub fn quotation_templates() -> Result<Tera, DeliveryError> {
    let mut tera = Tera::default();
    register_template_filters(&mut tera);

    tera.add_raw_template(
        QUOTATION_HTML,
        include_str!("../../../templates/email/quotation.html.tera"),
    )
    .map_err(|e| DeliveryError::Template(e.to_string()))?;

    tera.add_raw_template(
        QUOTATION_TEXT,
        include_str!("../../../templates/email/quotation.txt.tera"),
    )
    .map_err(|e| DeliveryError::Template(e.to_string()))?;

    Ok(tera)
}

pub fn render_quotation(
    tera: &Tera,
    email: &QuotationEmail,
    company_name: &str,
    currency: &str,
) -> Result<RenderedEmail, DeliveryError> {
    let mut context = Context::new();
    context.insert("quote", email);
    context.insert("company_name", company_name);
    context.insert("currency", currency);

    let html = tera
        .render(QUOTATION_HTML, &context)
        .map_err(|e| DeliveryError::Template(e.to_string()))?;
    let text = tera
        .render(QUOTATION_TEXT, &context)
        .map_err(|e| DeliveryError::Template(e.to_string()))?;

    Ok(RenderedEmail {
        subject: format!("Your charter quotation {}", email.quote_code),
        text,
        html,
    })
}

fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("money", tera_money_filter);
    tera.register_filter("long_date", tera_long_date_filter);
}

/// Currency filter backed by the shared money formatter.
/// Usage: `amount | money(currency=currency)`
fn tera_money_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let amount = match value {
        tera::Value::String(raw) => raw.parse::<Decimal>().ok(),
        tera::Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
        _ => None,
    }
    .ok_or_else(|| tera::Error::msg("money filter expects a decimal amount"))?;

    let currency = args
        .get("currency")
        .and_then(tera::Value::as_str)
        .unwrap_or("PHP");

    Ok(tera::Value::String(format_money(amount, currency)))
}

/// Spelled-out date for customer-facing copy.
/// Usage: `departure_date | long_date`
fn tera_long_date_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let raw = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("long_date filter expects a date string"))?;
    let date = raw
        .parse::<NaiveDate>()
        .map_err(|_| tera::Error::msg(format!("long_date filter got an invalid date `{raw}`")))?;

    Ok(tera::Value::String(format_long_date(date)))
}
