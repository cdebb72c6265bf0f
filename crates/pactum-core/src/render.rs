use rust_decimal::Decimal;

/// Substitutes the supported template placeholders and returns the rendered
/// snapshot that is stored on the contract. Rendering happens exactly once,
/// at contract creation; later template edits never change issued contracts.
pub fn render_template(
    body: &str,
    client_name: &str,
    business_name: &str,
    amount_cents: i64,
    currency: &str,
) -> String {
    body.replace("{{client_name}}", client_name)
        .replace("{{business_name}}", business_name)
        .replace("{{amount}}", &format_amount(amount_cents))
        .replace("{{currency}}", &currency.to_uppercase())
}

/// Minor units to display form: 150000 -> "1500", 150050 -> "1500.5".
pub fn format_amount(amount_cents: i64) -> String {
    Decimal::new(amount_cents, 2).normalize().to_string()
}
