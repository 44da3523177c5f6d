//! # Authority Code Catalog
//!
//! Static table from the authority's `codigoMsg` values to structured
//! descriptors. Codes missing from the table map to a generic retryable
//! `MH_UNKNOWN_ERROR` descriptor, so [`map_authority_code`] never fails.

use serde::{Deserialize, Serialize};

/// Internal code for authority codes missing from the table.
pub const UNKNOWN_AUTHORITY_CODE: &str = "MH_UNKNOWN_ERROR";

/// Internal code of the "received with observations" entry.
pub const OBSERVATIONS_CODE: &str = "MH_RECEIVED_WITH_OBSERVATIONS";

/// What part of the submission an authority code is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Auth,
    Data,
    Date,
    Calculation,
    Contingency,
    Technical,
    /// Not an error: acceptance with observations.
    Warning,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Data => "data",
            Self::Date => "date",
            Self::Calculation => "calculation",
            Self::Contingency => "contingency",
            Self::Technical => "technical",
            Self::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Success,
}

/// A mapped authority code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub category: Category,
    /// Stable internal code, e.g. `MH_DATA_ALREADY_EXISTS`.
    pub code: String,
    /// Technical message for logs and support.
    pub message: String,
    /// Plain-language message for the taxpayer.
    pub user_message: String,
    /// Whether resubmitting after a correction can succeed.
    pub retryable: bool,
    pub severity: Severity,
}

struct Entry {
    authority_code: &'static str,
    category: Category,
    code: &'static str,
    message: &'static str,
    user_message: &'static str,
    retryable: bool,
    severity: Severity,
}

impl Entry {
    fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            category: self.category,
            code: self.code.to_string(),
            message: self.message.to_string(),
            user_message: self.user_message.to_string(),
            retryable: self.retryable,
            severity: self.severity,
        }
    }
}

const CATALOG: &[Entry] = &[
    Entry {
        authority_code: "100",
        category: Category::Auth,
        code: "MH_AUTH_USER_INVALID",
        message: "El nombre de usuario no existe en el sistema",
        user_message: "El nombre de usuario que escribiste no existe. Revisa que no tengas espacios extra o letras cambiadas.",
        retryable: true,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "103",
        category: Category::Auth,
        code: "MH_AUTH_PASSWORD_EXPIRED",
        message: "La contraseña ha expirado",
        user_message: "Tu clave de acceso ya venció. Debes actualizarla desde la Consola de Administración.",
        retryable: false,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "105",
        category: Category::Auth,
        code: "MH_AUTH_PASSWORD_MISMATCH",
        message: "Las contraseñas no coinciden",
        user_message: "Al cambiar tu clave, escribiste algo diferente en la confirmación. Escribe ambas con cuidado para que sean idénticas.",
        retryable: true,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "106",
        category: Category::Auth,
        code: "MH_AUTH_CREDENTIALS_INVALID",
        message: "Credenciales inválidas",
        user_message: "El usuario o la contraseña no coinciden. Verifica tus datos y recuerda que la contraseña debe tener entre 13 y 25 caracteres, incluyendo letras, números y un carácter especial.",
        retryable: true,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "107",
        category: Category::Auth,
        code: "MH_AUTH_TOKEN_INVALID",
        message: "Token inválido",
        user_message: "Tu pase de entrada digital falló. Tu sistema debe solicitar un nuevo token de seguridad.",
        retryable: true,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "108",
        category: Category::Auth,
        code: "MH_AUTH_TOKEN_REQUIRED",
        message: "Token requerido",
        user_message: "Tu pase de entrada digital ya caducó. Tu sistema debe solicitar un nuevo token de seguridad.",
        retryable: true,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "003",
        category: Category::Data,
        code: "MH_DATA_INVALID_VALUE",
        message: "Valor no válido",
        user_message: "Pusiste un dato que el sistema no reconoce. Revisa que estés usando los códigos correctos (por ejemplo, el código de unidad de medida o de país).",
        retryable: true,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "004",
        category: Category::Data,
        code: "MH_DATA_ALREADY_EXISTS",
        message: "Registro ya existe",
        user_message: "Estás intentando enviar una factura con un número que ya habías enviado antes. Revisa tu correlativo; no puedes repetir números de control.",
        retryable: false,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "006",
        category: Category::Data,
        code: "MH_DATA_INVALID_FORMAT",
        message: "Formato no válido",
        user_message: "Algún dato, como el NIT o un correo, está mal escrito. Verifica que el NIT tenga 14 dígitos y los guiones correctos.",
        retryable: true,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "009",
        category: Category::Data,
        code: "MH_DATA_NIT_NOT_EXISTS",
        message: "NIT no existe",
        user_message: "El NIT que pusiste (ya sea el tuyo o el del cliente) no está registrado en el Ministerio de Hacienda. Pídele al cliente su tarjeta de NIT para confirmar el número.",
        retryable: true,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "010",
        category: Category::Data,
        code: "MH_DATA_INACTIVE_TAXPAYER",
        message: "Contribuyente no activo",
        user_message: "Tú o tu cliente aparecen como no activos para Hacienda. Debes revisar tu situación tributaria o la de tu cliente en el Ministerio.",
        retryable: false,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "017",
        category: Category::Date,
        code: "MH_DATE_INVALID",
        message: "Fecha no es correcta",
        user_message: "Pusiste una fecha que no existe (ej. 30 de febrero). Corrige el calendario de tu documento.",
        retryable: true,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "018",
        category: Category::Date,
        code: "MH_DATE_OUT_OF_DEADLINE",
        message: "Fecha fuera de plazo",
        user_message: "Estás enviando el documento demasiado tarde. Normalmente solo tienes hasta el día siguiente de la venta para enviarlo.",
        retryable: false,
        severity: Severity::Warning,
    },
    Entry {
        authority_code: "020",
        category: Category::Calculation,
        code: "MH_CALCULATION_INCORRECT",
        message: "Cálculo incorrecto",
        user_message: "Las sumas o el cálculo del IVA no cuadran con los precios que pusiste. Revisa tus sumas. El sistema permite una diferencia de apenas un centavo ($0.01).",
        retryable: true,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "012",
        category: Category::Contingency,
        code: "MH_CONTINGENCY_NO_EVENT",
        message: "No existe evento de contingencia",
        user_message: "Quieres enviar una factura atrasada por falta de internet, pero no has enviado primero el aviso de que tuviste problemas técnicos.",
        retryable: false,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "096",
        category: Category::Technical,
        code: "MH_TECHNICAL_JSON_SCHEMA",
        message: "No cumple esquema JSON",
        user_message: "El archivo digital que genera tu sistema está mal construido. Esto es un problema técnico que debe revisar el encargado de tu sistema.",
        retryable: false,
        severity: Severity::Error,
    },
    Entry {
        authority_code: "002",
        category: Category::Warning,
        code: OBSERVATIONS_CODE,
        message: "Recibido con observaciones",
        user_message: "Hacienda aceptó tu documento y es válido. Solo encontró un pequeño detalle que debes corregir en el futuro, pero no detuvo tu venta.",
        retryable: false,
        severity: Severity::Success,
    },
];

/// Look up a raw authority code. Surrounding whitespace is ignored.
pub fn lookup(authority_code: &str) -> Option<ErrorDescriptor> {
    let code = authority_code.trim();
    CATALOG
        .iter()
        .find(|e| e.authority_code == code)
        .map(Entry::descriptor)
}

/// Map a raw authority code, falling back to the unknown descriptor.
pub fn map_authority_code(authority_code: &str) -> ErrorDescriptor {
    lookup(authority_code).unwrap_or_else(|| ErrorDescriptor {
        category: Category::Technical,
        code: UNKNOWN_AUTHORITY_CODE.to_string(),
        message: format!("Error desconocido: {authority_code}"),
        user_message:
            "Ocurrió un error inesperado. Por favor, intenta nuevamente o contacta a soporte técnico."
                .to_string(),
        retryable: true,
        severity: Severity::Error,
    })
}

/// Every authority code in the table.
pub fn known_codes() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|e| e.authority_code)
}

/// Reverse lookup by internal code, e.g. for `dte explain MH_DATE_INVALID`.
pub fn find_by_internal_code(code: &str) -> Option<(&'static str, ErrorDescriptor)> {
    CATALOG
        .iter()
        .find(|e| e.code.eq_ignore_ascii_case(code.trim()))
        .map(|e| (e.authority_code, e.descriptor()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_has_seventeen_unique_codes() {
        let codes: HashSet<_> = known_codes().collect();
        assert_eq!(codes.len(), 17);
        assert_eq!(CATALOG.len(), 17);
        let internal: HashSet<_> = CATALOG.iter().map(|e| e.code).collect();
        assert_eq!(internal.len(), 17);
    }

    #[test]
    fn duplicate_document_is_not_retryable() {
        let d = map_authority_code("004");
        assert_eq!(d.code, "MH_DATA_ALREADY_EXISTS");
        assert_eq!(d.category, Category::Data);
        assert!(!d.retryable);
        assert_eq!(d.severity, Severity::Error);
    }

    #[test]
    fn out_of_deadline_is_a_warning() {
        let d = map_authority_code("018");
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.category, Category::Date);
    }

    #[test]
    fn observations_entry_is_success() {
        let d = map_authority_code("002");
        assert_eq!(d.code, OBSERVATIONS_CODE);
        assert_eq!(d.severity, Severity::Success);
        assert!(!d.retryable);
    }

    #[test]
    fn unknown_code_is_generic_and_retryable() {
        let d = map_authority_code("999");
        assert_eq!(d.code, UNKNOWN_AUTHORITY_CODE);
        assert_eq!(d.category, Category::Technical);
        assert!(d.retryable);
        assert_eq!(d.message, "Error desconocido: 999");
        assert!(lookup("999").is_none());
    }

    #[test]
    fn lookup_trims_whitespace() {
        assert_eq!(lookup(" 020 ").map(|d| d.code), Some("MH_CALCULATION_INCORRECT".to_string()));
    }

    #[test]
    fn reverse_lookup_is_case_insensitive() {
        let (raw, d) = find_by_internal_code("mh_date_invalid").unwrap();
        assert_eq!(raw, "017");
        assert!(d.retryable);
        assert!(find_by_internal_code("NOPE").is_none());
    }
}
