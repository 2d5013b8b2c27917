//! Invoice business logic - One invoice per paid checkout.

use crate::{
    entities::{Invoice, invoice, payment},
    errors::Result,
};
use chrono::Datelike;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Formats the human-facing invoice number for a payment.
#[must_use]
pub fn invoice_number(year: i32, payment_id: i64) -> String {
    format!("INV-{year}-{payment_id:06}")
}

/// Finds the invoice issued for a payment.
pub async fn get_invoice_for_payment<C>(db: &C, payment_id: i64) -> Result<Option<invoice::Model>>
where
    C: ConnectionTrait,
{
    Invoice::find()
        .filter(invoice::Column::PaymentId.eq(payment_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Issues the invoice for a paid payment, or returns the one already issued.
pub async fn issue_invoice<C>(db: &C, payment: &payment::Model) -> Result<invoice::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = get_invoice_for_payment(db, payment.id).await? {
        return Ok(existing);
    }

    let issued_at = payment.paid_at.unwrap_or_else(chrono::Utc::now);
    let invoice = invoice::ActiveModel {
        user_id: Set(payment.user_id),
        payment_id: Set(payment.id),
        number: Set(invoice_number(issued_at.year(), payment.id)),
        amount_cents: Set(payment.amount_cents),
        currency: Set(payment.currency.clone()),
        issued_at: Set(issued_at),
        ..Default::default()
    };
    Ok(invoice.insert(db).await?)
}

/// Lists a user's invoices, newest first.
pub async fn list_invoices_for_user(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<invoice::Model>> {
    Invoice::find()
        .filter(invoice::Column::UserId.eq(user_id))
        .order_by_desc(invoice::Column::IssuedAt)
        .all(db)
        .await
        .map_err(Into::into)
}
