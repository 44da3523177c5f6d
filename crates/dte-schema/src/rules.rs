//! # Numeric Reconciliation
//!
//! Declared totals must match what the line items and summary components
//! add up to, within [`TOLERANCE`]. Checks run in integer cents.
//!
//! Only sales-shaped documents (01, 03, 05, 06) are reconciled. A check
//! whose declared total is absent is skipped; the schema already reports
//! missing required totals.

use dte_core::{Amount, DocumentType, Dte, LineItem};

use crate::validate::FieldViolation;

/// Maximum accepted difference between a declared and a computed amount.
pub const TOLERANCE: Amount = Amount::from_cents(1);

fn money(value: Option<f64>) -> Amount {
    Amount::from_decimal(value.unwrap_or(0.0))
}

/// Whether the document type carries sales line items and totals.
pub fn is_sales_shaped(document_type: DocumentType) -> bool {
    match document_type {
        DocumentType::Invoice
        | DocumentType::TaxCreditVoucher
        | DocumentType::CreditNote
        | DocumentType::DebitNote => true,
        DocumentType::DeliveryNote
        | DocumentType::WithholdingVoucher
        | DocumentType::SettlementVoucher
        | DocumentType::AccountingSettlement
        | DocumentType::ExportInvoice
        | DocumentType::ExcludedSubjectInvoice
        | DocumentType::DonationVoucher => false,
    }
}

struct Collector {
    violations: Vec<FieldViolation>,
}

impl Collector {
    fn check(&mut self, field: String, declared: Amount, expected: Amount) {
        if !declared.within(expected, TOLERANCE) {
            let code = format!("RULE-{:04}", self.violations.len() + 1);
            self.violations.push(FieldViolation::new(
                code,
                field,
                format!("valor declarado {declared} no coincide con el calculado {expected}"),
            ));
        }
    }
}

fn item_expected_sales(item: &LineItem) -> Option<Amount> {
    let quantity = item.quantity?;
    let unit_price = item.unit_price?;
    let gross = Amount::from_decimal(quantity * unit_price);
    Some(gross - money(item.discount))
}

/// Reconcile declared totals. Empty result means consistent.
pub fn reconcile(dte: &Dte) -> Vec<FieldViolation> {
    let mut c = Collector {
        violations: Vec::new(),
    };
    if !is_sales_shaped(dte.document_type()) {
        return c.violations;
    }

    for (idx, item) in dte.items.iter().enumerate() {
        if let Some(expected) = item_expected_sales(item) {
            let declared = money(item.non_subject) + money(item.exempt) + money(item.taxed);
            c.check(format!("cuerpoDocumento.{idx}"), declared, expected);
        }
    }

    let s = &dte.summary;
    let sum_items = |f: fn(&LineItem) -> Option<f64>| -> Amount {
        dte.items.iter().map(|i| money(f(i))).sum()
    };

    if s.total_non_subject.is_some() {
        c.check(
            "resumen.totalNoSuj".into(),
            money(s.total_non_subject),
            sum_items(|i| i.non_subject),
        );
    }
    if s.total_exempt.is_some() {
        c.check(
            "resumen.totalExenta".into(),
            money(s.total_exempt),
            sum_items(|i| i.exempt),
        );
    }
    if s.total_taxed.is_some() {
        c.check(
            "resumen.totalGravada".into(),
            money(s.total_taxed),
            sum_items(|i| i.taxed),
        );
    }

    let sales_subtotal =
        money(s.total_non_subject) + money(s.total_exempt) + money(s.total_taxed);
    if s.sales_subtotal.is_some() {
        c.check(
            "resumen.subTotalVentas".into(),
            money(s.sales_subtotal),
            sales_subtotal,
        );
    }

    let discounts =
        money(s.discount_non_subject) + money(s.discount_exempt) + money(s.discount_taxed);
    if s.subtotal.is_some() {
        c.check(
            "resumen.subTotal".into(),
            money(s.subtotal),
            s.sales_subtotal
                .map(Amount::from_decimal)
                .unwrap_or(sales_subtotal)
                - discounts,
        );
    }

    let tributes: Amount = s
        .tributes()
        .iter()
        .map(|t| Amount::from_decimal(t.value))
        .sum();
    if s.operation_total.is_some() {
        c.check(
            "resumen.montoTotalOperacion".into(),
            money(s.operation_total),
            money(s.subtotal) + tributes,
        );
    }

    if s.total_payable.is_some() {
        let expected = money(s.operation_total) + money(s.vat_perceived)
            - money(s.vat_withheld)
            - money(s.income_withheld)
            + money(s.total_non_taxed);
        c.check("resumen.totalPagar".into(), money(s.total_payable), expected);
    }

    c.violations
}
