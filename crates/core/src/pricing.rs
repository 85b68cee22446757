//! Checkout totals.
//!
//! The subtotal is the sum of line totals built from converted, rounded unit
//! prices, the same figures stored on order lines. Shipping and tax are
//! computed in the base currency, then converted and rounded on their own.
//! The total is the sum of the rounded components.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Cart, Currency, Money};

/// Shipping fee and tax rate applied at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutPolicy {
    /// Flat shipping fee in the base currency.
    pub shipping_fee: Decimal,
    /// Tax rate as a fraction, e.g. `0.19`.
    pub tax_rate: Decimal,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            shipping_fee: Decimal::new(2500, 2),
            tax_rate: Decimal::new(19, 2),
        }
    }
}

/// Breakdown of what a customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutTotals {
    pub currency: Currency,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl CheckoutTotals {
    /// Compute totals for `cart` in `currency`.
    ///
    /// Shipping is only charged on non-empty carts and tax applies to goods
    /// only, so an empty cart yields all-zero totals.
    #[must_use]
    pub fn compute(cart: &Cart, policy: &CheckoutPolicy, currency: Currency) -> Self {
        let subtotal_base = cart.subtotal();
        let shipping_base = if cart.is_empty() {
            Decimal::ZERO
        } else {
            policy.shipping_fee
        };
        let tax_base = subtotal_base * policy.tax_rate;

        let convert = |amount: Decimal| Money::base(amount).convert_to(currency).amount;
        let subtotal = cart.subtotal_in(currency);
        let shipping = convert(shipping_base);
        let tax = convert(tax_base);

        Self {
            currency,
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }

    #[must_use]
    pub const fn subtotal_money(&self) -> Money {
        Money::new(self.subtotal, self.currency)
    }

    #[must_use]
    pub const fn shipping_money(&self) -> Money {
        Money::new(self.shipping, self.currency)
    }

    #[must_use]
    pub const fn tax_money(&self) -> Money {
        Money::new(self.tax, self.currency)
    }

    #[must_use]
    pub const fn total_money(&self) -> Money {
        Money::new(self.total, self.currency)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{CartItem, ProductId};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn cart(lines: &[(i32, &str, u32)]) -> Cart {
        let mut cart = Cart::new();
        for (id, price, qty) in lines {
            cart.add(CartItem {
                id: ProductId::new(*id),
                part_number: id.to_string(),
                name: id.to_string(),
                price: dec(price),
                quantity: *qty,
                image: None,
            });
        }
        cart
    }

    #[test]
    fn test_total_is_subtotal_plus_shipping_plus_tax() {
        let cart = cart(&[(1, "100.00", 2), (2, "50.00", 1)]);
        let totals = CheckoutTotals::compute(&cart, &CheckoutPolicy::default(), Currency::Eur);

        assert_eq!(totals.subtotal, dec("250.00"));
        assert_eq!(totals.shipping, dec("25.00"));
        assert_eq!(totals.tax, dec("47.50"));
        assert_eq!(totals.total, dec("322.50"));
    }

    #[test]
    fn test_empty_cart_is_all_zero() {
        let totals =
            CheckoutTotals::compute(&Cart::new(), &CheckoutPolicy::default(), Currency::Usd);
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(totals.currency, Currency::Usd);
    }

    #[test]
    fn test_components_are_converted_then_summed() {
        let cart = cart(&[(1, "9.99", 3)]);
        let policy = CheckoutPolicy {
            shipping_fee: dec("10"),
            tax_rate: dec("0.19"),
        };
        let totals = CheckoutTotals::compute(&cart, &policy, Currency::Ron);

        // 29.97 * 4.97 = 148.9509
        assert_eq!(totals.subtotal, dec("148.95"));
        // 10 * 4.97
        assert_eq!(totals.shipping, dec("49.70"));
        // 29.97 * 0.19 = 5.6943; * 4.97 = 28.300671
        assert_eq!(totals.tax, dec("28.30"));
        assert_eq!(totals.total, totals.subtotal + totals.shipping + totals.tax);
        assert_eq!(totals.total_money().minor_units(), Some(22_695));
    }

    #[test]
    fn test_subtotal_matches_sum_of_converted_lines() {
        let cart = cart(&[(1, "10.05", 10), (2, "3.33", 7)]);
        let totals = CheckoutTotals::compute(&cart, &CheckoutPolicy::default(), Currency::Usd);

        // 10.05 * 1.08 = 10.854 -> 10.85 per unit, not 100.50 * 1.08 = 108.54
        assert_eq!(cart.items[0].unit_price_in(Currency::Usd), dec("10.85"));
        let lines: Decimal = cart
            .items
            .iter()
            .map(|i| i.unit_price_in(Currency::Usd) * Decimal::from(i.quantity))
            .sum();
        assert_eq!(totals.subtotal, lines);
        assert_eq!(totals.subtotal, dec("108.50") + dec("25.20"));
        assert_eq!(totals.total, totals.subtotal + totals.shipping + totals.tax);
    }

    #[test]
    fn test_zero_tax_policy() {
        let cart = cart(&[(1, "1.00", 1)]);
        let policy = CheckoutPolicy {
            shipping_fee: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
        };
        let totals = CheckoutTotals::compute(&cart, &policy, Currency::Eur);
        assert_eq!(totals.total, dec("1.00"));
    }
}
