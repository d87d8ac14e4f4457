//! Scoring signals and their dictionaries

use crate::models::DocumentType;
use crate::text::matches_keyword;
use std::collections::BTreeSet;
use unicode_segmentation::UnicodeSegmentation;

pub const THEME_WEIGHT: f64 = 0.15;
pub const THEME_CAP: f64 = 0.30;
pub const DEPARTMENT_WEIGHT: f64 = 0.25;
pub const LEXICAL_WEIGHT: f64 = 0.10;
pub const LEXICAL_CAP: f64 = 0.30;
pub const TYPE_AFFINITY_WEIGHT: f64 = 0.10;
pub const IDENTIFIER_WEIGHT: f64 = 0.40;

/// Shortest word counted for lexical overlap
pub const MIN_WORD_CHARS: usize = 4;

/// Topic categories, each with folded keywords
pub const THEMES: &[(&str, &[&str])] = &[
    (
        "contratacion",
        &["contrato", "licitacion", "adjudicacion", "concurso", "suministro", "pliego",
          "formalizacion", "obras", "servicios", "acuerdo marco"],
    ),
    (
        "sanidad",
        &["sanidad", "sanitari", "hospital", "salud", "medicamento", "farmac", "vacuna",
          "asistencia medica"],
    ),
    (
        "educacion",
        &["educacion", "universidad", "escolar", "docente", "formacion", "becas",
          "ensenanza", "alumnado"],
    ),
    (
        "defensa",
        &["defensa", "militar", "ejercito", "armada", "fuerzas armadas", "armamento"],
    ),
    (
        "infraestructuras",
        &["carretera", "ferroviari", "obra publica", "infraestructura", "puerto",
          "aeropuerto", "autovia", "tunel"],
    ),
    (
        "energia",
        &["energia", "electric", "renovable", "hidrocarburo", "gas natural", "combustible",
          "fotovoltaic"],
    ),
    (
        "medio_ambiente",
        &["medio ambiente", "residuos", "agua", "forestal", "clima", "emisiones",
          "depuradora", "biodiversidad"],
    ),
    (
        "digital",
        &["digital", "informatic", "software", "telecomunicaciones", "tecnologia",
          "ciberseguridad", "licencias", "datos"],
    ),
];

/// Canonical department keys and the folded aliases that resolve to them
pub const DEPARTMENTS: &[(&str, &[&str])] = &[
    ("defensa", &["defensa", "ejercito", "armada", "estado mayor"]),
    ("interior", &["interior", "guardia civil", "policia", "instituciones penitenciarias"]),
    ("hacienda", &["hacienda", "agencia tributaria", "funcion publica"]),
    ("economia", &["economia", "asuntos economicos", "transformacion digital"]),
    ("sanidad", &["sanidad", "servicio de salud", "ingesa", "consumo"]),
    ("educacion", &["educacion", "formacion profesional"]),
    ("ciencia", &["ciencia", "innovacion", "universidades", "csic"]),
    ("transportes", &["transportes", "fomento", "movilidad", "adif", "aena", "puertos del estado"]),
    ("trabajo", &["trabajo", "empleo", "seguridad social", "inclusion", "sepe"]),
    ("justicia", &["justicia", "relaciones con las cortes"]),
    ("industria", &["industria", "comercio", "turismo"]),
    (
        "transicion_ecologica",
        &["transicion ecologica", "medio ambiente", "confederacion hidrografica", "reto demografico"],
    ),
    ("agricultura", &["agricultura", "pesca", "alimentacion"]),
    ("cultura", &["cultura", "deporte"]),
    ("exteriores", &["asuntos exteriores", "cooperacion", "aecid", "union europea"]),
];

/// Document types that suggest a procurement relationship
pub const PROCUREMENT_ADJACENT_TYPES: &[DocumentType] = &[
    DocumentType::Announcement,
    DocumentType::Resolution,
    DocumentType::Agreement,
    DocumentType::Covenant,
    DocumentType::Order,
];

/// Function words long enough to pass the length filter
const STOPWORDS: &[&str] = &[
    "para", "sobre", "desde", "entre", "como", "esta", "este", "estos", "estas", "cuyo",
    "cuya", "donde", "segun", "hasta", "ante", "tras", "contra", "mediante", "durante",
    "dicho", "dicha", "cual", "cuales", "otros", "otras",
];

/// Theme categories present in folded text; keywords are stems matched anywhere
pub fn themes_of(folded: &str) -> BTreeSet<&'static str> {
    THEMES
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| folded.contains(k)))
        .map(|(theme, _)| *theme)
        .collect()
}

/// Canonical department key for a folded department name
pub fn department_key(folded: &str) -> Option<&'static str> {
    DEPARTMENTS
        .iter()
        .find(|(_, aliases)| aliases.iter().any(|a| matches_keyword(folded, a)))
        .map(|(key, _)| *key)
}

/// Significant words of folded text
pub fn words_of(folded: &str) -> BTreeSet<String> {
    folded
        .unicode_words()
        .filter(|w| w.chars().count() >= MIN_WORD_CHARS)
        .filter(|w| !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}
