//! Amount normalization applied before reconciliation and signing.
//!
//! Monetary fields round half-up to 2 decimals, quantities and unit prices
//! to 8. Absent fields stay absent.

use dte_core::{round_half_up, Dte, MONEY_DECIMALS, QUANTITY_DECIMALS};

fn round_money(field: &mut Option<f64>) {
    if let Some(v) = field.as_mut() {
        *v = round_half_up(*v, MONEY_DECIMALS);
    }
}

fn round_quantity(field: &mut Option<f64>) {
    if let Some(v) = field.as_mut() {
        *v = round_half_up(*v, QUANTITY_DECIMALS);
    }
}

/// Round every typed amount of `dte` in place.
pub fn normalize(dte: &mut Dte) {
    for item in &mut dte.items {
        round_quantity(&mut item.quantity);
        round_quantity(&mut item.unit_price);
        for field in [
            &mut item.discount,
            &mut item.non_subject,
            &mut item.exempt,
            &mut item.taxed,
            &mut item.non_taxed,
            &mut item.item_tax,
            &mut item.suggested_price,
        ] {
            round_money(field);
        }
    }

    let s = &mut dte.summary;
    for field in [
        &mut s.total_non_subject,
        &mut s.total_exempt,
        &mut s.total_taxed,
        &mut s.sales_subtotal,
        &mut s.discount_non_subject,
        &mut s.discount_exempt,
        &mut s.discount_taxed,
        &mut s.discount_percentage,
        &mut s.total_discount,
        &mut s.total_tax,
        &mut s.subtotal,
        &mut s.vat_perceived,
        &mut s.vat_withheld,
        &mut s.income_withheld,
        &mut s.operation_total,
        &mut s.total_non_taxed,
        &mut s.total_payable,
        &mut s.balance_in_favor,
        &mut s.total_withholding,
        &mut s.total_vat_withheld,
        &mut s.total_subject_to_withholding,
    ] {
        round_money(field);
    }

    let tributes: Vec<_> = s
        .tributes()
        .into_iter()
        .map(|mut t| {
            t.value = round_half_up(t.value, MONEY_DECIMALS);
            t
        })
        .collect();
    s.set_tributes(&tributes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use dte_core::document::fixtures;

    #[test]
    fn rounds_money_and_quantities() {
        let mut dte = Dte::from_value(fixtures::voucher_json()).expect("decode");
        dte.items[0].quantity = Some(1.123456789);
        dte.items[0].taxed = Some(10.005);
        dte.summary.total_taxed = Some(10.004999);
        normalize(&mut dte);
        assert_eq!(dte.items[0].quantity, Some(1.12345679));
        assert_eq!(dte.items[0].taxed, Some(10.01));
        assert_eq!(dte.summary.total_taxed, Some(10.0));
    }

    #[test]
    fn rounds_tribute_values() {
        let mut dte = Dte::from_value(fixtures::voucher_json()).expect("decode");
        let mut tributes = dte.summary.tributes();
        tributes[0].value = 1.2999999;
        dte.summary.set_tributes(&tributes);
        normalize(&mut dte);
        assert_eq!(dte.summary.tributes()[0].value, 1.3);
    }

    #[test]
    fn absent_fields_stay_absent() {
        let mut dte = Dte::from_value(fixtures::withholding_json()).expect("decode");
        normalize(&mut dte);
        assert!(dte.summary.total_taxed.is_none());
        assert_eq!(dte.summary.total_vat_withheld, Some(1.0));
    }
}
