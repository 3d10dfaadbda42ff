//! Built-in field catalog used to seed a new knowledge base.

use crate::field::{FieldDefinition, FieldId};
use crate::knowledge::{GENERIC_ERP, KnowledgeBase, SystemSettings};
use crate::synonym::SynonymEntry;

/// (field, description, [(erp, header, boost)])
type Seed = (FieldId, &'static str, &'static [(&'static str, &'static str, f64)]);

const SEEDS: &[Seed] = &[
    (
        FieldId::JournalEntryId,
        "Unique identifier of the journal entry",
        &[
            (GENERIC_ERP, "Asiento", 0.9),
            (GENERIC_ERP, "NumAsiento", 0.95),
            (GENERIC_ERP, "ID_Asiento", 0.9),
            ("SAP", "BELNR", 0.95),
            ("ContaPlus", "ASIEN", 0.95),
            ("Oracle", "je_header_id", 0.9),
            ("Navision", "document_no", 0.8),
        ],
    ),
    (
        FieldId::LineNumber,
        "Sequential line number within the entry",
        &[
            (GENERIC_ERP, "Linea", 0.9),
            (GENERIC_ERP, "NumLinea", 0.95),
            (GENERIC_ERP, "LineaAsiento", 0.9),
            ("SAP", "BUZEI", 0.95),
            ("Oracle", "je_line_num", 0.9),
        ],
    ),
    (
        FieldId::Description,
        "Header-level description of the entry",
        &[
            (GENERIC_ERP, "Concepto", 0.9),
            (GENERIC_ERP, "ConceptoAsiento", 0.95),
            (GENERIC_ERP, "DescripcionCabecera", 0.9),
            ("SAP", "BKTXT", 0.9),
            ("ContaPlus", "CONCEPTO", 0.9),
        ],
    ),
    (
        FieldId::LineDescription,
        "Description of an individual line",
        &[
            (GENERIC_ERP, "DescripcionLinea", 0.9),
            (GENERIC_ERP, "DetalleLinea", 0.8),
            ("SAP", "SGTXT", 0.9),
            ("Oracle", "line_description", 0.8),
        ],
    ),
    (
        FieldId::PostingDate,
        "Effective accounting date of the entry",
        &[
            (GENERIC_ERP, "Fecha", 0.9),
            (GENERIC_ERP, "FechaAsiento", 0.95),
            (GENERIC_ERP, "FechaContabilizacion", 0.9),
            ("SAP", "BUDAT", 0.95),
            ("ContaPlus", "FECHA", 0.95),
            ("Oracle", "effective_date", 0.9),
            ("Navision", "posting_date", 0.9),
        ],
    ),
    (
        FieldId::FiscalYear,
        "Fiscal year of the accounting period",
        &[
            (GENERIC_ERP, "Año", 0.8),
            (GENERIC_ERP, "AñoFiscal", 0.95),
            (GENERIC_ERP, "Ejercicio", 0.9),
            ("SAP", "GJAHR", 0.95),
            ("Oracle", "period_year", 0.8),
        ],
    ),
    (
        FieldId::PeriodNumber,
        "Accounting period (month) number",
        &[
            (GENERIC_ERP, "Periodo", 0.9),
            (GENERIC_ERP, "Mes", 0.8),
            (GENERIC_ERP, "PeriodoContable", 0.95),
            ("SAP", "MONAT", 0.95),
            ("Oracle", "period_num", 0.9),
        ],
    ),
    (
        FieldId::GlAccountNumber,
        "Chart of accounts code",
        &[
            (GENERIC_ERP, "Cuenta", 0.9),
            (GENERIC_ERP, "CuentaContable", 0.95),
            (GENERIC_ERP, "CodigoCuenta", 0.9),
            ("SAP", "HKONT", 0.95),
            ("ContaPlus", "SUBCTA", 0.95),
            ("Oracle", "account", 0.8),
            ("Navision", "g_l_account_no", 0.9),
        ],
    ),
    (
        FieldId::Amount,
        "Signed monetary amount of the line",
        &[
            (GENERIC_ERP, "Importe", 0.95),
            (GENERIC_ERP, "Saldo", 0.9),
            (GENERIC_ERP, "Total", 0.8),
            ("SAP", "DMBTR", 0.95),
            ("Oracle", "entered_amount", 0.8),
        ],
    ),
    (
        FieldId::DebitAmount,
        "Debit side amount",
        &[
            (GENERIC_ERP, "Debe", 0.95),
            (GENERIC_ERP, "ImporteDebe", 0.9),
            (GENERIC_ERP, "Debito", 0.8),
            ("SAP", "SOLLBETRAG", 0.9),
            ("ContaPlus", "EURODEBE", 0.95),
            ("Oracle", "entered_dr", 0.9),
            ("Navision", "debit_amount", 0.9),
        ],
    ),
    (
        FieldId::CreditAmount,
        "Credit side amount",
        &[
            (GENERIC_ERP, "Haber", 0.95),
            (GENERIC_ERP, "ImporteHaber", 0.9),
            (GENERIC_ERP, "Credito", 0.8),
            ("SAP", "HABENBETRAG", 0.9),
            ("ContaPlus", "EUROHABER", 0.95),
            ("Oracle", "entered_cr", 0.9),
            ("Navision", "credit_amount", 0.9),
        ],
    ),
    (
        FieldId::DebitCreditIndicator,
        "Debit (D) or credit (H) marker",
        &[
            (GENERIC_ERP, "IndicadorDH", 0.9),
            (GENERIC_ERP, "DebeHaber", 0.8),
            ("SAP", "SHKZG", 0.95),
            ("Oracle", "dc_indicator", 0.8),
        ],
    ),
    (
        FieldId::PreparedBy,
        "User who prepared the entry",
        &[
            (GENERIC_ERP, "Usuario", 0.8),
            (GENERIC_ERP, "PreparadoPor", 0.95),
            (GENERIC_ERP, "CreadoPor", 0.9),
            ("SAP", "USNAM", 0.9),
            ("Oracle", "created_by", 0.8),
        ],
    ),
    (
        FieldId::EntryDate,
        "Date the entry was keyed into the system",
        &[
            (GENERIC_ERP, "FechaEntrada", 0.95),
            (GENERIC_ERP, "FechaCreacion", 0.9),
            (GENERIC_ERP, "FechaCaptura", 0.8),
            ("SAP", "CPUDT", 0.9),
            ("Oracle", "creation_date", 0.8),
        ],
    ),
    (
        FieldId::EntryTime,
        "Time the entry was keyed into the system",
        &[
            (GENERIC_ERP, "HoraEntrada", 0.95),
            (GENERIC_ERP, "HoraCreacion", 0.9),
            ("SAP", "CPUTM", 0.9),
            ("Oracle", "creation_time", 0.8),
        ],
    ),
    (
        FieldId::GlAccountName,
        "Name of the general ledger account",
        &[
            (GENERIC_ERP, "NombreCuenta", 0.95),
            (GENERIC_ERP, "DescripcionCuenta", 0.9),
            (GENERIC_ERP, "DenominacionCuenta", 0.8),
            ("SAP", "TXT50", 0.9),
            ("Oracle", "account_description", 0.8),
            ("Navision", "account_name", 0.8),
        ],
    ),
    (
        FieldId::VendorId,
        "Vendor or third-party identifier",
        &[
            (GENERIC_ERP, "Proveedor", 0.9),
            (GENERIC_ERP, "IDProveedor", 0.95),
            (GENERIC_ERP, "CodigoProveedor", 0.9),
            (GENERIC_ERP, "Tercero", 0.8),
            ("SAP", "LIFNR", 0.95),
            ("Oracle", "vendor_id", 0.9),
            ("Navision", "vendor_no", 0.8),
        ],
    ),
];

impl KnowledgeBase {
    /// All seventeen canonical fields seeded with the built-in synonyms.
    pub fn with_default_catalog() -> Self {
        let mut kb = KnowledgeBase::new(SystemSettings::default());
        for (id, description, synonyms) in SEEDS {
            let mut definition = FieldDefinition::new(*id).with_description(*description);
            for (erp, header, boost) in *synonyms {
                definition.insert_synonym(SynonymEntry::new(*erp, *header, *boost));
            }
            kb.insert_seed(definition);
        }
        kb
    }
}
