//! Static extraction tables for the registry and bulletin parsers
//!
//! Regex alternations in Rust are leftmost-first, so within each table the
//! more specific label must precede the more general one ("Adm. Unico" before
//! "Administrador", "Liquidador M" before "Liquidador").

use super::rx;
use crate::models::{ActSection, ActType};
use regex::Regex;
use std::sync::LazyLock;

/// Role labels as they appear in filings, with their canonical name
pub const ROLE_LABELS: &[(&str, &str)] = &[
    (r"Adm\. [UÚ]nico", "Administrador único"),
    (r"Adm\. Solid\.", "Administrador solidario"),
    (r"Adm\. Mancom\.", "Administrador mancomunado"),
    (r"Adm\. Concursal", "Administrador concursal"),
    (r"Adm\.Supl\.", "Administrador suplente"),
    (r"Administrador", "Administrador"),
    (r"Apo\.Man\.Soli", "Apoderado mancomunado solidario"),
    (r"Apo\.Manc\.", "Apoderado mancomunado"),
    (r"Apo\.Sol\.", "Apoderado solidario"),
    (r"Apoderado", "Apoderado"),
    (r"Liquidador M", "Liquidador mancomunado"),
    (r"Liq\. ?Solid\.", "Liquidador solidario"),
    (r"Liquidador", "Liquidador"),
    (r"Cons\.Del\.Man", "Consejero delegado mancomunado"),
    (r"Cons\.Del\.Sol", "Consejero delegado solidario"),
    (r"Con\.Delegado", "Consejero delegado"),
    (r"Consejero", "Consejero"),
    (r"Pres\.Com\.Ej", "Presidente comisión ejecutiva"),
    (r"Miem\.Com\.Ej", "Miembro comisión ejecutiva"),
    (r"Vicepresid\.", "Vicepresidente"),
    (r"Vicepresidente", "Vicepresidente"),
    (r"Presidente", "Presidente"),
    (r"SecreNoConsj", "Secretario no consejero"),
    (r"Vicesecret\.", "Vicesecretario"),
    (r"Secretario", "Secretario"),
    (r"Aud\.C\.Con\.", "Auditor de cuentas consolidadas"),
    (r"Aud\.Supl\.", "Auditor suplente"),
    (r"Auditor", "Auditor"),
    (r"Entid\.Deposit\.", "Entidad depositaria"),
    (r"Entid\.Gestora", "Entidad gestora"),
    (r"Representan", "Representante"),
    (r"Director Gral\.", "Director general"),
    (r"Gerente", "Gerente"),
    (r"Patrono", "Patrono"),
    (r"Interventor", "Interventor"),
];

/// Act markers: phrases that open a block of act text
///
/// The four section headers carry their [`ActSection`]; every other marker
/// resets attribution to [`ActSection::General`].
pub const ACT_MARKERS: &[(&str, ActSection)] = &[
    (r"Cancelaciones de oficio de nombramientos\.", ActSection::General),
    (r"Nombramientos\.", ActSection::Appointments),
    (r"Ceses/Dimisiones\.", ActSection::Cessations),
    (r"Reelecciones\.", ActSection::Reelections),
    (r"Revocaciones\.", ActSection::Revocations),
    (r"Constituci[oó]n\.", ActSection::General),
    (r"Reducci[oó]n y ampliaci[oó]n de capital\.", ActSection::General),
    (r"Ampliaci[oó]n de capital\.", ActSection::General),
    (r"Reducci[oó]n de capital\.", ActSection::General),
    (r"Desembolso de dividendos pasivos\.", ActSection::General),
    (r"Cambio de domicilio social\.", ActSection::General),
    (r"Cambio de denominaci[oó]n social\.", ActSection::General),
    (r"Cambio de objeto social\.", ActSection::General),
    (r"Modificaciones estatutarias\.", ActSection::General),
    (r"Disoluci[oó]n\.", ActSection::General),
    (r"Extinci[oó]n\.", ActSection::General),
    (r"Transformaci[oó]n de sociedad\.", ActSection::General),
    (r"Fusi[oó]n por absorci[oó]n\.", ActSection::General),
    (r"Fusi[oó]n por uni[oó]n\.", ActSection::General),
    (r"Escisi[oó]n (?:parcial|total)\.", ActSection::General),
    (r"Declaraci[oó]n de unipersonalidad\.", ActSection::General),
    (r"P[eé]rdida del car[aá]cter de unipersonalidad\.", ActSection::General),
    (r"Sociedad unipersonal\.", ActSection::General),
    (r"Situaci[oó]n concursal\.", ActSection::General),
    (r"Emisi[oó]n de obligaciones\.", ActSection::General),
    (r"Reapertura hoja registral\.", ActSection::General),
    (r"Cierre provisional[^.]{0,80}\.", ActSection::General),
    (r"Otros conceptos:", ActSection::General),
    (r"Fe de erratas:", ActSection::General),
    (r"Datos registrales\.", ActSection::General),
];

/// Folded act phrases scanned independently of the markers
pub const ACT_TYPES: &[(&str, ActType)] = &[
    ("constitucion", ActType::Incorporation),
    ("nombramientos", ActType::Appointment),
    ("ceses/dimisiones", ActType::Cessation),
    ("reelecciones", ActType::Reelection),
    ("revocaciones", ActType::Revocation),
    ("ampliacion de capital", ActType::CapitalIncrease),
    ("reduccion de capital", ActType::CapitalDecrease),
    ("cambio de domicilio social", ActType::AddressChange),
    ("disolucion", ActType::Dissolution),
    ("extincion", ActType::Extinction),
    ("transformacion de sociedad", ActType::Transformation),
    ("fusion por", ActType::Merger),
    ("escision", ActType::Demerger),
    ("declaracion de unipersonalidad", ActType::SoleShareholderDeclaration),
    ("perdida del caracter de unipersonalidad", ActType::SoleShareholderLoss),
    ("modificaciones estatutarias", ActType::BylawAmendment),
    ("cambio de denominacion social", ActType::NameChange),
    ("cambio de objeto social", ActType::PurposeChange),
    ("situacion concursal", ActType::Insolvency),
];

/// Page furniture dropped before reflowing registry text
pub const BOILERPLATE_LINES: &[&str] = &[
    r"(?i)^BOLET[IÍ]N OFICIAL DEL REGISTRO MERCANTIL",
    r"(?i)^N[uú]m\.\s*\d+\s+.*P[aá]g\.\s*\d+",
    r"(?i)^cve:\s*BORME",
    r"(?i)verificable en\s",
    r"(?i)https?://www\.boe\.es",
    r"(?i)^D\.\s*L\.:",
    r"(?i)^ISSN",
    r"(?i)^SECCI[OÓ]N PRIMERA",
    r"(?i)^Empresarios$",
    r"(?i)^Actos inscritos$",
    r"^\d{1,5}$",
];

/// Province banners, folded and upper-cased
pub const PROVINCES: &[&str] = &[
    "A CORUNA", "ALAVA", "ALBACETE", "ALICANTE", "ALMERIA", "ASTURIAS", "AVILA",
    "BADAJOZ", "ILLES BALEARS", "BARCELONA", "BIZKAIA", "BURGOS", "CACERES", "CADIZ",
    "CANTABRIA", "CASTELLON", "CEUTA", "CIUDAD REAL", "CORDOBA", "CUENCA", "GIPUZKOA",
    "GIRONA", "GRANADA", "GUADALAJARA", "HUELVA", "HUESCA", "JAEN", "LA RIOJA",
    "LAS PALMAS", "LEON", "LLEIDA", "LUGO", "MADRID", "MALAGA", "MELILLA", "MURCIA",
    "NAVARRA", "OURENSE", "PALENCIA", "PONTEVEDRA", "SALAMANCA",
    "SANTA CRUZ DE TENERIFE", "SEGOVIA", "SEVILLA", "SORIA", "TARRAGONA", "TERUEL",
    "TOLEDO", "VALENCIA", "VALLADOLID", "ZAMORA", "ZARAGOZA",
];

/// Alternate banner spellings (co-official names, older forms)
pub const PROVINCE_ALIASES: &[&str] = &[
    "ARABA", "ALACANT", "BALEARES", "CASTELLO", "GUIPUZCOA", "VIZCAYA",
    "LA CORUNA", "GERONA", "LERIDA", "ORENSE", "NAFARROA",
];

/// Combined role-label pattern; group `label` is the raw label text
pub static ROLE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = ROLE_LABELS
        .iter()
        .map(|(pattern, _)| format!("(?:{pattern})"))
        .collect::<Vec<_>>()
        .join("|");
    rx(&format!(r"(?:^|[\s.;])(?P<label>{alternation})\s*:"))
});

/// Per-label anchored patterns used to resolve which label matched
pub static ROLE_LABEL_EXACT: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    ROLE_LABELS
        .iter()
        .map(|(pattern, canonical)| (rx(&format!("^(?:{pattern})$")), *canonical))
        .collect()
});

/// Combined act-marker pattern
pub static ACT_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = ACT_MARKERS
        .iter()
        .map(|(pattern, _)| format!("(?:{pattern})"))
        .collect::<Vec<_>>()
        .join("|");
    rx(&alternation)
});

/// Per-marker anchored patterns used to resolve a marker's section
pub static ACT_MARKER_EXACT: LazyLock<Vec<(Regex, ActSection)>> = LazyLock::new(|| {
    ACT_MARKERS
        .iter()
        .map(|(pattern, section)| (rx(&format!("^(?:{pattern})$")), *section))
        .collect()
});

/// Labels of the auxiliary fields inside an entry's act text
pub static FIELD_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    rx(r"(?i)(?:^|\s)(?:Comienzo de operaciones|Objeto social|Domicilio|Resultante Suscrito|Resultante Desembolsado|Capital|Suscrito|Desembolsado|Socio [uú]nico|Duraci[oó]n)\s*:")
});

/// Entry boundary: `NNNN - ` at the start of the text or after whitespace
pub static ENTRY_BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?:^|\s)(\d{4,6}) - "));

pub static BOILERPLATE_RE: LazyLock<Vec<Regex>> =
    LazyLock::new(|| BOILERPLATE_LINES.iter().map(|p| rx(p)).collect());

/// Resolve the canonical role for a raw label
pub fn canonical_role(label: &str) -> Option<&'static str> {
    ROLE_LABEL_EXACT
        .iter()
        .find(|(re, _)| re.is_match(label))
        .map(|(_, canonical)| *canonical)
}

/// Resolve the act section opened by a raw marker
pub fn marker_section(marker: &str) -> ActSection {
    ACT_MARKER_EXACT
        .iter()
        .find(|(re, _)| re.is_match(marker))
        .map(|(_, section)| *section)
        .unwrap_or(ActSection::General)
}

/// Whether a folded upper-case line names a known province
pub fn is_province_name(folded_upper: &str) -> bool {
    folded_upper.split('/').map(str::trim).any(|part| {
        PROVINCES.contains(&part) || PROVINCE_ALIASES.contains(&part)
    })
}
