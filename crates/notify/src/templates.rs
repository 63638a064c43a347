use rental_agreements_types::{Order, ReminderTier};
use rust_decimal::Decimal;

use crate::mailer::EmailMessage;

/// Everything the copy needs beyond the order itself
#[derive(Debug, Clone)]
pub struct MessageContext {
    pub from_address: String,
    pub from_name: String,
    /// Phone number the critical tier tells the customer to call
    pub office_phone: String,
}

/// Renders the message for each escalation tier
pub struct Templates {
    context: MessageContext,
}

impl Templates {
    pub fn new(context: MessageContext) -> Self {
        Self { context }
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.context.from_name, self.context.from_address)
    }

    fn format_money(amount: Decimal) -> String {
        format!("${}", amount.round_dp(2))
    }

    fn delivery_line(order: &Order) -> String {
        match order.delivery_at {
            Some(at) => format!("Delivery: {}", at.format("%A, %B %-d at %-I:%M %p UTC")),
            None => "Delivery: to be scheduled".to_string(),
        }
    }

    fn order_summary(order: &Order) -> String {
        let mut lines: Vec<String> = order
            .line_items
            .iter()
            .map(|item| {
                format!(
                    "  {} x {} - {}",
                    item.quantity,
                    item.description,
                    Self::format_money(item.subtotal())
                )
            })
            .collect();
        lines.push(format!("  Total: {}", Self::format_money(order.total_amount)));
        lines.join("\n")
    }

    pub fn render(
        &self,
        tier: ReminderTier,
        order: &Order,
        signing_url: Option<&str>,
    ) -> EmailMessage {
        match tier {
            ReminderTier::Initial => self.initial(order, signing_url),
            ReminderTier::Normal => self.normal(order, signing_url),
            ReminderTier::Urgent => self.urgent(order, signing_url),
            ReminderTier::Critical => self.critical(order, signing_url),
            ReminderTier::SignedConfirmed => self.signed_confirmation(order),
            ReminderTier::None => unreachable!("no message exists for the none tier"),
        }
    }

    fn base(&self, order: &Order, subject: String, body: String) -> EmailMessage {
        let text = format!(
            "Hi {},\n\n{}\n\n{}\n{}\n\nThank you,\n{}",
            order.customer_name,
            body,
            Self::delivery_line(order),
            Self::order_summary(order),
            self.context.from_name,
        );
        let html = format!(
            "<p>Hi {},</p><p>{}</p><p>{}</p><pre>{}</pre><p>Thank you,<br>{}</p>",
            order.customer_name,
            body,
            Self::delivery_line(order),
            Self::order_summary(order),
            self.context.from_name,
        );

        EmailMessage {
            from: self.from_header(),
            to: order.customer_email.clone(),
            subject,
            text,
            html,
        }
    }

    fn signing_line(signing_url: Option<&str>) -> String {
        match signing_url {
            Some(url) => format!("Sign your rental agreement here: {url}"),
            None => "Your signing link is on its way in a separate message.".to_string(),
        }
    }

    fn initial(&self, order: &Order, signing_url: Option<&str>) -> EmailMessage {
        self.base(
            order,
            format!("Rental agreement for order {}", order.id),
            format!(
                "Your booking is confirmed! Before we can deliver, we need \
                 your signature on the rental agreement. {}",
                Self::signing_line(signing_url)
            ),
        )
    }

    fn normal(&self, order: &Order, signing_url: Option<&str>) -> EmailMessage {
        self.base(
            order,
            format!("Reminder: rental agreement for order {}", order.id),
            format!(
                "Just a friendly reminder that your rental agreement is \
                 still waiting for a signature. {}",
                Self::signing_line(signing_url)
            ),
        )
    }

    fn urgent(&self, order: &Order, signing_url: Option<&str>) -> EmailMessage {
        self.base(
            order,
            format!("Action needed: rental agreement for order {}", order.id),
            format!(
                "Your delivery is coming up soon and we still need your \
                 signature on the rental agreement. We cannot deliver \
                 without it. {}",
                Self::signing_line(signing_url)
            ),
        )
    }

    /// The only tier whose copy threatens cancellation and asks for an
    /// immediate phone call.
    fn critical(&self, order: &Order, signing_url: Option<&str>) -> EmailMessage {
        self.base(
            order,
            format!("FINAL NOTICE: rental agreement for order {}", order.id),
            format!(
                "This is our final notice: without your signature we will \
                 have to cancel your delivery. {} If you are having any \
                 trouble signing, call us right away at {}.",
                Self::signing_line(signing_url),
                self.context.office_phone
            ),
        )
    }

    fn signed_confirmation(&self, order: &Order) -> EmailMessage {
        self.base(
            order,
            format!("Agreement received for order {}", order.id),
            "We received your signed rental agreement - you are all set! \
             Your delivery is confirmed."
                .to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rental_agreements_types::LineItem;

    fn templates() -> Templates {
        Templates::new(MessageContext {
            from_address: "bookings@partyrentals.example".to_string(),
            from_name: "Party Rentals".to_string(),
            office_phone: "(555) 010-2030".to_string(),
        })
    }

    fn test_order() -> Order {
        let mut order = Order::new("order-7", "jo@example.com", "Jo Doe");
        order.line_items = vec![LineItem::new("Bounce castle", 1, Decimal::new(25000, 2))];
        order.total_amount = Decimal::new(25000, 2);
        order
    }

    #[test]
    fn test_initial_includes_signing_link() {
        let message = templates().render(
            ReminderTier::Initial,
            &test_order(),
            Some("https://sign.example.com/s/abc"),
        );

        assert!(message.text.contains("https://sign.example.com/s/abc"));
        assert_eq!(message.to, "jo@example.com");
        assert!(message.subject.contains("order-7"));
    }

    #[test]
    fn test_only_critical_threatens_cancellation() {
        let order = test_order();
        let t = templates();
        let url = Some("https://sign.example.com/s/abc");

        let critical = t.render(ReminderTier::Critical, &order, url);
        assert!(critical.text.contains("cancel"));
        assert!(critical.text.contains("(555) 010-2030"));

        for tier in [
            ReminderTier::Initial,
            ReminderTier::Normal,
            ReminderTier::Urgent,
        ] {
            let message = t.render(tier, &order, url);
            assert!(
                !message.text.contains("cancel"),
                "{tier:?} copy must not threaten cancellation"
            );
        }
    }

    #[test]
    fn test_confirmation_copy() {
        let message = templates().render(ReminderTier::SignedConfirmed, &test_order(), None);
        assert!(message.text.contains("all set"));
        assert!(message.text.contains("Total: $250.00"));
    }
}
