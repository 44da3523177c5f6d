//! # Fiscal Document Model
//!
//! Typed view of a DTE as exchanged with the signing service and the tax
//! authority. Only the sections the pipeline reads or rewrites are typed:
//! the identification block, the issuer NIT, the line-item amounts and the
//! summary totals. Everything else (receiver, related documents, appendix,
//! type-specific item fields) is carried verbatim in flattened maps so that
//! a decode/encode cycle never drops content the signer must see.
//!
//! JSON field names follow the authority schema; Rust field names are
//! English.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::amount::Amount;
use crate::catalog::{DocumentType, Environment};
use crate::error::DocumentError;
use crate::identity::{ControlNumber, GenerationCode};

/// `tipoModelo` for documents transmitted in real time.
pub const MODEL_PRIOR: u8 = 1;
/// `tipoModelo` for documents signed offline and transmitted later.
pub const MODEL_DEFERRED: u8 = 2;
/// `tipoOperacion` for normal transmission.
pub const OPERATION_NORMAL: u8 = 1;
/// `tipoOperacion` for transmission under contingency.
pub const OPERATION_CONTINGENCY: u8 = 2;
/// `tipoContingencia` code for an internet service outage.
pub const CONTINGENCY_INTERNET_OUTAGE: u8 = 2;

/// Tribute code for VAT in the summary `tributos` list.
pub const VAT_TRIBUTE_CODE: &str = "20";

/// An electronic tax document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dte {
    #[serde(rename = "identificacion")]
    pub identification: Identification,

    #[serde(rename = "emisor")]
    pub issuer: Issuer,

    #[serde(
        rename = "cuerpoDocumento",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub items: Vec<LineItem>,

    #[serde(rename = "resumen")]
    pub summary: Summary,

    /// Signature attached by a previous signing cycle.
    #[serde(rename = "firma", default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Authority receipt stamp from a previous transmission.
    #[serde(
        rename = "selloRecibido",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub receipt_stamp: Option<String>,

    /// Authority receipt timestamp from a previous transmission.
    #[serde(
        rename = "fechaHoraRecepcion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub receipt_timestamp: Option<String>,

    /// Receiver, related documents, extension, appendix and any other section.
    #[serde(flatten)]
    pub sections: Map<String, Value>,
}

/// The `identificacion` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    pub version: u32,

    #[serde(rename = "ambiente")]
    pub environment: Environment,

    #[serde(rename = "tipoDte")]
    pub document_type: DocumentType,

    #[serde(rename = "numeroControl")]
    pub control_number: ControlNumber,

    #[serde(rename = "codigoGeneracion")]
    pub generation_code: GenerationCode,

    #[serde(rename = "tipoModelo")]
    pub model: u8,

    #[serde(rename = "tipoOperacion")]
    pub operation: u8,

    #[serde(rename = "tipoContingencia")]
    pub contingency_type: Option<u8>,

    #[serde(rename = "motivoContin")]
    pub contingency_reason: Option<String>,

    #[serde(rename = "fecEmi")]
    pub emission_date: NaiveDate,

    #[serde(rename = "horEmi")]
    pub emission_time: NaiveTime,

    #[serde(rename = "tipoMoneda")]
    pub currency: String,
}

/// The `emisor` block. Only the NIT and name are typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issuer {
    pub nit: String,

    #[serde(rename = "nombre")]
    pub name: String,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// One entry of `cuerpoDocumento`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "cantidad", default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,

    #[serde(rename = "precioUni", default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,

    #[serde(rename = "montoDescu", default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,

    #[serde(rename = "ventaNoSuj", default, skip_serializing_if = "Option::is_none")]
    pub non_subject: Option<f64>,

    #[serde(rename = "ventaExenta", default, skip_serializing_if = "Option::is_none")]
    pub exempt: Option<f64>,

    #[serde(rename = "ventaGravada", default, skip_serializing_if = "Option::is_none")]
    pub taxed: Option<f64>,

    #[serde(rename = "noGravado", default, skip_serializing_if = "Option::is_none")]
    pub non_taxed: Option<f64>,

    #[serde(rename = "ivaItem", default, skip_serializing_if = "Option::is_none")]
    pub item_tax: Option<f64>,

    #[serde(rename = "psv", default, skip_serializing_if = "Option::is_none")]
    pub suggested_price: Option<f64>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// The `resumen` block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    #[serde(rename = "totalNoSuj", default, skip_serializing_if = "Option::is_none")]
    pub total_non_subject: Option<f64>,

    #[serde(rename = "totalExenta", default, skip_serializing_if = "Option::is_none")]
    pub total_exempt: Option<f64>,

    #[serde(rename = "totalGravada", default, skip_serializing_if = "Option::is_none")]
    pub total_taxed: Option<f64>,

    #[serde(rename = "subTotalVentas", default, skip_serializing_if = "Option::is_none")]
    pub sales_subtotal: Option<f64>,

    #[serde(rename = "descuNoSuj", default, skip_serializing_if = "Option::is_none")]
    pub discount_non_subject: Option<f64>,

    #[serde(rename = "descuExenta", default, skip_serializing_if = "Option::is_none")]
    pub discount_exempt: Option<f64>,

    #[serde(rename = "descuGravada", default, skip_serializing_if = "Option::is_none")]
    pub discount_taxed: Option<f64>,

    #[serde(
        rename = "porcentajeDescuento",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub discount_percentage: Option<f64>,

    #[serde(rename = "totalDescu", default, skip_serializing_if = "Option::is_none")]
    pub total_discount: Option<f64>,

    #[serde(rename = "totalIva", default, skip_serializing_if = "Option::is_none")]
    pub total_tax: Option<f64>,

    #[serde(rename = "subTotal", default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<f64>,

    #[serde(rename = "ivaPerci1", default, skip_serializing_if = "Option::is_none")]
    pub vat_perceived: Option<f64>,

    #[serde(rename = "ivaRete1", default, skip_serializing_if = "Option::is_none")]
    pub vat_withheld: Option<f64>,

    #[serde(rename = "reteRenta", default, skip_serializing_if = "Option::is_none")]
    pub income_withheld: Option<f64>,

    #[serde(
        rename = "montoTotalOperacion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_total: Option<f64>,

    #[serde(rename = "totalNoGravado", default, skip_serializing_if = "Option::is_none")]
    pub total_non_taxed: Option<f64>,

    #[serde(rename = "totalPagar", default, skip_serializing_if = "Option::is_none")]
    pub total_payable: Option<f64>,

    #[serde(rename = "saldoFavor", default, skip_serializing_if = "Option::is_none")]
    pub balance_in_favor: Option<f64>,

    /// Withholding voucher total under its generic name.
    #[serde(rename = "totalRetencion", default, skip_serializing_if = "Option::is_none")]
    pub total_withholding: Option<f64>,

    /// Withholding voucher VAT total.
    #[serde(
        rename = "totalIVAretenido",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub total_vat_withheld: Option<f64>,

    #[serde(
        rename = "totalSujetoRetencion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub total_subject_to_withholding: Option<f64>,

    /// `tributos`, `pagos`, `totalLetras` and other untyped fields. Kept
    /// raw so that an explicit `null` survives re-encoding.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// One entry of `resumen.tributos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tribute {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "valor")]
    pub value: f64,
}

fn money(value: Option<f64>) -> Amount {
    Amount::from_decimal(value.unwrap_or(0.0))
}

impl Summary {
    /// Summary tributes; empty when absent or `null`.
    pub fn tributes(&self) -> Vec<Tribute> {
        self.other
            .get("tributos")
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Replace the tribute list if the document carries one.
    pub fn set_tributes(&mut self, tributes: &[Tribute]) {
        if matches!(self.other.get("tributos"), Some(v) if !v.is_null()) {
            if let Ok(value) = serde_json::to_value(tributes) {
                self.other.insert("tributos".to_string(), value);
            }
        }
    }

    /// Tax amount: the VAT tribute when listed, else `totalIva`.
    pub fn tax_amount(&self) -> Amount {
        self.tributes()
            .iter()
            .find(|t| t.code == VAT_TRIBUTE_CODE)
            .map(|t| Amount::from_decimal(t.value))
            .unwrap_or_else(|| money(self.total_tax))
    }

    pub fn taxed_amount(&self) -> Amount {
        money(self.total_taxed)
    }

    pub fn exempt_amount(&self) -> Amount {
        money(self.total_exempt)
    }

    pub fn non_subject_amount(&self) -> Amount {
        money(self.total_non_subject)
    }

    /// VAT withheld on a withholding voucher.
    pub fn withheld_vat_amount(&self) -> Amount {
        money(self.total_vat_withheld.or(self.total_withholding))
    }

    pub fn income_withheld_amount(&self) -> Amount {
        money(self.income_withheld)
    }
}

impl Dte {
    /// Decode a document from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Decode a document from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let kind = match &value {
            Value::Object(_) => None,
            Value::Null => Some("null"),
            Value::Bool(_) => Some("boolean"),
            Value::Number(_) => Some("number"),
            Value::String(_) => Some("string"),
            Value::Array(_) => Some("array"),
        };
        if let Some(kind) = kind {
            return Err(DocumentError::NotAnObject { kind });
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Encode to the authority JSON shape.
    pub fn to_value(&self) -> Result<Value, DocumentError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn generation_code(&self) -> &GenerationCode {
        &self.identification.generation_code
    }

    pub fn document_type(&self) -> DocumentType {
        self.identification.document_type
    }

    /// Copy with the artifacts of a previous signing or transmission cycle
    /// removed: `firma`, `selloRecibido`, `fechaHoraRecepcion`.
    pub fn without_cycle_artifacts(&self) -> Self {
        let mut clean = self.clone();
        clean.signature = None;
        clean.receipt_stamp = None;
        clean.receipt_timestamp = None;
        clean.sections.remove("firma");
        clean.sections.remove("selloRecibido");
        clean.sections.remove("fechaHoraRecepcion");
        clean
    }

    /// Identifier of the counterparty on the receiving side, if any.
    ///
    /// Reads `receptor.nit`, then `receptor.numDocumento`, then the
    /// excluded-subject block used by type 14.
    pub fn receiver_id(&self) -> Option<String> {
        ["receptor", "sujetoExcluido"]
            .iter()
            .filter_map(|key| self.sections.get(*key))
            .flat_map(|block| ["nit", "numDocumento"].map(|f| block.get(f)))
            .flatten()
            .find_map(|v| v.as_str().map(str::to_string))
    }

    /// Whether the document is marked for deferred transmission.
    pub fn is_deferred(&self) -> bool {
        self.identification.model == MODEL_DEFERRED
    }
}

/// Signed compact JWS returned by the signing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureEnvelope(String);

impl SignatureEnvelope {
    pub fn new(jws: impl Into<String>) -> Self {
        Self(jws.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Lowercase hex SHA-256 of the envelope bytes, stored alongside the
    /// document record for tamper checks.
    pub fn digest_hex(&self) -> String {
        Sha256::digest(self.0.as_bytes())
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

/// Reusable fixtures for tests across the workspace.
pub mod fixtures {
    use serde_json::{json, Value};

    /// A consistent tax credit voucher (type 03) in sandbox: one taxed item
    /// of 10.00 with 1.30 VAT listed as tribute `20`.
    pub fn voucher_json() -> Value {
        json!({
            "identificacion": {
                "version": 1,
                "ambiente": "00",
                "tipoDte": "03",
                "numeroControl": "DTE-03-M001P001-000000000000001",
                "codigoGeneracion": "3F2504E0-4F89-41D3-9A0C-0305E82C3301",
                "tipoModelo": 1,
                "tipoOperacion": 1,
                "tipoContingencia": null,
                "motivoContin": null,
                "fecEmi": "2024-01-15",
                "horEmi": "10:30:00",
                "tipoMoneda": "USD"
            },
            "documentoRelacionado": null,
            "emisor": {
                "nit": "06140101901013",
                "nrc": "1234567",
                "nombre": "Comercial Ejemplo S.A. de C.V.",
                "codActividad": "47190",
                "descActividad": "Venta al por menor",
                "nombreComercial": null,
                "tipoEstablecimiento": "01",
                "direccion": { "departamento": "06", "municipio": "14", "complemento": "Centro" },
                "telefono": "22222222",
                "correo": "facturas@ejemplo.com.sv",
                "codEstableMH": null,
                "codEstable": null,
                "codPuntoVentaMH": null,
                "codPuntoVenta": null
            },
            "receptor": {
                "nit": "06142503911025",
                "nrc": "7654321",
                "nombre": "Cliente Corporativo S.A.",
                "codActividad": "46900",
                "descActividad": "Venta al por mayor",
                "nombreComercial": null,
                "direccion": { "departamento": "06", "municipio": "14", "complemento": "Colonia Escalon" },
                "telefono": null,
                "correo": "compras@cliente.com.sv"
            },
            "otrosDocumentos": null,
            "ventaTercero": null,
            "cuerpoDocumento": [{
                "numItem": 1,
                "tipoItem": 1,
                "numeroDocumento": null,
                "cantidad": 1,
                "codigo": "SKU-1",
                "codTributo": null,
                "uniMedida": 59,
                "descripcion": "Producto de prueba",
                "precioUni": 10,
                "montoDescu": 0,
                "ventaNoSuj": 0,
                "ventaExenta": 0,
                "ventaGravada": 10,
                "tributos": ["20"],
                "psv": 0,
                "noGravado": 0
            }],
            "resumen": {
                "totalNoSuj": 0,
                "totalExenta": 0,
                "totalGravada": 10,
                "subTotalVentas": 10,
                "descuNoSuj": 0,
                "descuExenta": 0,
                "descuGravada": 0,
                "porcentajeDescuento": 0,
                "totalDescu": 0,
                "tributos": [{ "codigo": "20", "descripcion": "Impuesto al Valor Agregado 13%", "valor": 1.3 }],
                "subTotal": 10,
                "ivaRete1": 0,
                "reteRenta": 0,
                "montoTotalOperacion": 11.3,
                "totalNoGravado": 0,
                "totalPagar": 11.3,
                "totalLetras": "ONCE DÓLARES CON 30/100 USD",
                "ivaPerci1": 0,
                "saldoFavor": 0,
                "condicionOperacion": 1,
                "pagos": null,
                "numPagoElectronico": null
            },
            "extension": null,
            "apendice": null
        })
    }

    /// A withholding voucher (type 07) as received from a counterparty.
    pub fn withholding_json() -> Value {
        let mut doc = voucher_json();
        doc["identificacion"]["tipoDte"] = json!("07");
        doc["identificacion"]["numeroControl"] = json!("DTE-07-M001P001-000000000000009");
        doc["identificacion"]["codigoGeneracion"] = json!("9B2C7A10-1D2E-4F3A-8B4C-5D6E7F809A1B");
        doc["cuerpoDocumento"] = json!([{
            "numItem": 1,
            "tipoDte": "03",
            "tipoDoc": 2,
            "numDocumento": "5A1B2C3D-4E5F-4A6B-8C7D-9E0F1A2B3C4D",
            "fechaEmision": "2024-01-10",
            "montoSujetoGrav": 100,
            "codigoRetencionMH": "22",
            "ivaRetenido": 1,
            "descripcion": "Retencion IVA 1%"
        }]);
        doc["resumen"] = json!({
            "totalSujetoRetencion": 100,
            "totalIVAretenido": 1,
            "totalIVAretenidoLetras": "UN DÓLAR CON 00/100 USD"
        });
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voucher() -> Dte {
        Dte::from_value(fixtures::voucher_json()).expect("fixture decodes")
    }

    #[test]
    fn decodes_typed_fields() {
        let dte = voucher();
        assert_eq!(dte.document_type(), DocumentType::TaxCreditVoucher);
        assert_eq!(dte.identification.environment, Environment::Sandbox);
        assert_eq!(
            dte.generation_code().as_str(),
            "3F2504E0-4F89-41D3-9A0C-0305E82C3301"
        );
        assert_eq!(dte.items.len(), 1);
        assert_eq!(dte.summary.taxed_amount(), Amount::from_cents(1000));
        assert_eq!(dte.summary.tax_amount(), Amount::from_cents(130));
    }

    #[test]
    fn re_encoding_keeps_untyped_sections_and_nulls() {
        let encoded = voucher().to_value().expect("encode");
        assert_eq!(encoded["receptor"]["nombre"], "Cliente Final");
        assert!(encoded["identificacion"]["tipoContingencia"].is_null());
        assert!(encoded["apendice"].is_null());
        assert!(encoded.as_object().is_some_and(|o| o.contains_key("apendice")));
        assert!(encoded["documentoRelacionado"].is_null());
        assert_eq!(encoded["cuerpoDocumento"][0]["tributos"][0], "20");
        assert_eq!(encoded["identificacion"]["fecEmi"], "2024-01-15");
        assert_eq!(encoded["identificacion"]["horEmi"], "10:30:00");
    }

    #[test]
    fn strips_cycle_artifacts() {
        let mut value = fixtures::voucher_json();
        value["firma"] = Value::String("old.jws".into());
        value["selloRecibido"] = Value::String("2024ABC".into());
        value["fechaHoraRecepcion"] = Value::String("2024-01-15T10:31:00".into());
        let dte = Dte::from_value(value).expect("decode");
        assert!(dte.signature.is_some());

        let clean = dte.without_cycle_artifacts().to_value().expect("encode");
        let obj = clean.as_object().expect("object");
        assert!(!obj.contains_key("firma"));
        assert!(!obj.contains_key("selloRecibido"));
        assert!(!obj.contains_key("fechaHoraRecepcion"));
        assert!(obj.contains_key("receptor"));
    }

    #[test]
    fn tax_amount_falls_back_to_total_iva() {
        let mut dte = voucher();
        dte.summary.other.insert("tributos".into(), Value::Null);
        dte.summary.total_tax = Some(2.6);
        assert_eq!(dte.summary.tax_amount(), Amount::from_cents(260));
    }

    #[test]
    fn set_tributes_leaves_null_untouched() {
        let mut dte = voucher();
        dte.summary.other.insert("tributos".into(), Value::Null);
        dte.summary.set_tributes(&[Tribute {
            code: "20".into(),
            description: None,
            value: 1.0,
        }]);
        assert!(dte.summary.other["tributos"].is_null());
    }

    #[test]
    fn withholding_voucher_amounts() {
        let dte = Dte::from_value(fixtures::withholding_json()).expect("decode");
        assert!(dte.document_type().is_withholding());
        assert_eq!(dte.summary.withheld_vat_amount(), Amount::from_cents(100));
        assert_eq!(dte.items.len(), 1);
        assert!(dte.items[0].taxed.is_none());
        assert_eq!(dte.items[0].other["ivaRetenido"], 1);
    }

    #[test]
    fn receiver_id_reads_receptor_nit() {
        assert_eq!(voucher().receiver_id().as_deref(), Some("06142503911025"));
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert!(matches!(
            Dte::from_value(Value::Array(vec![])),
            Err(DocumentError::NotAnObject { kind: "array" })
        ));
        assert!(matches!(
            Dte::from_json_str("{not json"),
            Err(DocumentError::Decode(_))
        ));
    }

    #[test]
    fn envelope_digest_is_stable_hex() {
        let env = SignatureEnvelope::new("a.b.c");
        let digest = env.digest_hex();
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, SignatureEnvelope::new("a.b.c").digest_hex());
        assert!(!env.is_empty());
        assert!(SignatureEnvelope::new("  ").is_empty());
    }
}
