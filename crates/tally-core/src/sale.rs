//! # Sale Pricing & Tender
//!
//! Turns a cart into priced transaction lines and settles the payment.
//! Nothing here touches the store; the processor in `tally-db` runs these
//! steps and then commits the result atomically.
//!
//! ## Checkout Steps
//! ```text
//! cart [{product_id, qty}]
//!   │
//!   ├─ normalize_cart     EmptyCart, qty 1..=MAX_LINE_QUANTITY, merge dupes
//!   ├─ price_cart         ProductNotFound, snapshot name/price/category
//!   └─ settle_payment     CASH: InsufficientPayment or change
//!                         QRIS/CARD: exact amount, change 0
//! ```

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CartLine, PaymentMethod, Product, TransactionLine};
use crate::validation::{
    overflow, validate_cart_size, validate_id, validate_line_quantity,
    validate_non_negative_amount,
};

/// Validated lines with their grand total.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedCart {
    pub lines: Vec<TransactionLine>,
    pub grand_total: Money,
}

/// Amount taken and change given for a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tender {
    pub amount_paid: Money,
    pub change: Money,
}

/// Validates cart lines and merges repeated products.
///
/// Order of first appearance is kept. Quantities are validated both per
/// submitted line and after merging.
pub fn normalize_cart(lines: &[CartLine]) -> CoreResult<Vec<CartLine>> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }
    validate_cart_size(lines.len())?;

    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for line in lines {
        validate_id("product id", &line.product_id)?;
        validate_line_quantity(line.qty)?;

        match positions.get(line.product_id.as_str()) {
            Some(&idx) => merged[idx].qty += line.qty,
            None => {
                positions.insert(line.product_id.as_str(), merged.len());
                merged.push(line.clone());
            }
        }
    }

    for line in &merged {
        validate_line_quantity(line.qty)?;
    }

    Ok(merged)
}

/// Prices normalized lines from the *current* products.
pub fn price_cart(lines: &[CartLine], products: &HashMap<String, Product>) -> CoreResult<PricedCart> {
    let mut priced = Vec::with_capacity(lines.len());
    let mut grand_total = Money::zero();

    for line in lines {
        let product = products
            .get(&line.product_id)
            .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

        let tx_line = TransactionLine {
            product_id: product.id.clone(),
            product: product.snapshot(),
            qty: line.qty,
        };
        grand_total = grand_total
            .checked_add(tx_line.line_total()?)
            .ok_or_else(|| overflow("grand total"))?;
        priced.push(tx_line);
    }

    Ok(PricedCart {
        lines: priced,
        grand_total,
    })
}

/// Settles payment against `grand_total`.
///
/// Non-cash payments are taken for the exact total whatever was entered.
pub fn settle_payment(
    method: PaymentMethod,
    amount_paid: Money,
    grand_total: Money,
) -> CoreResult<Tender> {
    if !method.is_cash() {
        return Ok(Tender {
            amount_paid: grand_total,
            change: Money::zero(),
        });
    }

    if amount_paid < grand_total {
        return Err(CoreError::InsufficientPayment {
            required: grand_total,
            tendered: amount_paid,
        });
    }
    validate_non_negative_amount("amount paid", amount_paid)?;

    Ok(Tender {
        amount_paid,
        change: amount_paid - grand_total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::MAX_LINE_QUANTITY;
    use chrono::Utc;

    fn product(id: &str, price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            price: Money::from_minor(price),
            category: "Coffee".to_string(),
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog() -> HashMap<String, Product> {
        [product("p1", 18_000), product("p2", 15_000)]
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect()
    }

    #[test]
    fn test_empty_cart() {
        assert!(matches!(normalize_cart(&[]).unwrap_err(), CoreError::EmptyCart));
    }

    #[test]
    fn test_merges_duplicate_products() {
        let lines = normalize_cart(&[
            CartLine::new("p1", 1),
            CartLine::new("p2", 1),
            CartLine::new("p1", 2),
        ])
        .unwrap();
        assert_eq!(lines, vec![CartLine::new("p1", 3), CartLine::new("p2", 1)]);
    }

    #[test]
    fn test_rejects_bad_quantities() {
        assert!(matches!(
            normalize_cart(&[CartLine::new("p1", 0)]).unwrap_err(),
            CoreError::Validation(_)
        ));
        assert!(normalize_cart(&[
            CartLine::new("p1", MAX_LINE_QUANTITY),
            CartLine::new("p1", 1)
        ])
        .is_err());
    }

    #[test]
    fn test_price_cart_snapshots_current_price() {
        let priced = price_cart(&[CartLine::new("p1", 2), CartLine::new("p2", 1)], &catalog()).unwrap();
        assert_eq!(priced.grand_total, Money::from_minor(51_000));
        assert_eq!(priced.lines[0].product.price, Money::from_minor(18_000));
        assert_eq!(priced.lines[0].product.name, "Product p1");
    }

    #[test]
    fn test_price_cart_unknown_product() {
        assert!(matches!(
            price_cart(&[CartLine::new("p9", 1)], &catalog()).unwrap_err(),
            CoreError::ProductNotFound(id) if id == "p9"
        ));
    }

    #[test]
    fn test_price_cart_overflow_is_an_error() {
        let mut products = catalog();
        products.insert("p9".to_string(), product("p9", i64::MAX / 2));
        assert!(matches!(
            price_cart(&[CartLine::new("p9", 3)], &products).unwrap_err(),
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            price_cart(&[CartLine::new("p9", 2), CartLine::new("p1", 1)], &products).unwrap_err(),
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_cash_tender_is_bounded() {
        let total = Money::from_minor(36_000);
        assert!(matches!(
            settle_payment(PaymentMethod::Cash, Money::from_minor(i64::MAX), total).unwrap_err(),
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_cash_change_and_shortfall() {
        let total = Money::from_minor(36_000);
        let tender = settle_payment(PaymentMethod::Cash, Money::from_minor(50_000), total).unwrap();
        assert_eq!(tender.change, Money::from_minor(14_000));

        let exact = settle_payment(PaymentMethod::Cash, total, total).unwrap();
        assert!(exact.change.is_zero());

        assert!(matches!(
            settle_payment(PaymentMethod::Cash, Money::from_minor(20_000), total).unwrap_err(),
            CoreError::InsufficientPayment { .. }
        ));
    }

    #[test]
    fn test_non_cash_takes_exact_total() {
        let total = Money::from_minor(36_000);
        let tender = settle_payment(PaymentMethod::Qris, Money::zero(), total).unwrap();
        assert_eq!(tender.amount_paid, total);
        assert!(tender.change.is_zero());
    }
}
