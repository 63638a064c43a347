use rental_agreements_types::Order;
use rust_decimal::Decimal;
use serde::Serialize;

/// One prefilled field of the agreement template
#[derive(Debug, Clone, Serialize)]
pub struct TemplateField {
    pub name: String,
    pub default_value: String,
}

impl TemplateField {
    pub fn new(name: impl Into<String>, default_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_value: default_value.into(),
        }
    }
}

fn format_money(amount: Decimal) -> String {
    format!("${}", amount.round_dp(2))
}

/// Build the point-in-time field snapshot of an order that gets baked into
/// a new submission. Later edits to the order do not flow into a submission
/// that already exists.
pub fn agreement_fields(order: &Order) -> Vec<TemplateField> {
    let delivery_date = order
        .delivery_at
        .map(|at| at.format("%B %-d, %Y %-I:%M %p UTC").to_string())
        .unwrap_or_else(|| "To be scheduled".to_string());

    let rental_items = if order.line_items.is_empty() {
        "No items listed".to_string()
    } else {
        order
            .line_items
            .iter()
            .map(|item| {
                format!(
                    "{} x {} - {}",
                    item.quantity,
                    item.description,
                    format_money(item.subtotal())
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    vec![
        TemplateField::new("customer_name", order.customer_name.clone()),
        TemplateField::new("customer_email", order.customer_email.clone()),
        TemplateField::new("order_number", order.id.clone()),
        TemplateField::new("delivery_date", delivery_date),
        TemplateField::new("rental_items", rental_items),
        TemplateField::new("order_total", format_money(order.total_amount)),
    ]
}
