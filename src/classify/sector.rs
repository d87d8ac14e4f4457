use super::{first_hit, KeywordTable};

/// Label used when no sector keyword matches
pub const DEFAULT_SECTOR: &str = "Otros";

/// Sector categories, checked in order
pub const SECTORS: &KeywordTable = &[
    (
        "Cooperación internacional y ayuda humanitaria",
        &[
            "humanitari", "refugiad", "cooperacion internacional", "cooperacion al desarrollo",
            "ayuda al desarrollo", "aecid", "desplazad", "asilo",
        ],
    ),
    (
        "Investigación, desarrollo e innovación",
        &[
            "investigacion", "i+d", "innovacion", "cientific", "tecnologic", "predoctoral",
            "postdoctoral", "doctorado", "laboratorio",
        ],
    ),
    (
        "Educación y formación",
        &[
            "educacion", "educativ", "formacion", "beca", "becas", "escolar", "universidad",
            "ensenanza", "alumnado", "estudiantes",
        ],
    ),
    (
        "Empleo",
        &[
            "empleo", "desemplead", "insercion laboral", "contratacion indefinida",
            "autonomos", "emprendimiento", "emprendedor",
        ],
    ),
    (
        "Salud y servicios sociales",
        &[
            "sanitari", "salud", "dependencia", "discapacidad", "servicios sociales",
            "mayores", "inclusion social", "vulnerab", "pobreza", "adicciones",
        ],
    ),
    (
        "Cultura y patrimonio",
        &[
            "cultura", "patrimonio", "museo", "teatro", "cine", "musica",
            "artes escenicas", "libro", "bibliotec", "audiovisual",
        ],
    ),
    (
        "Deporte",
        &["deporte", "deportiv", "olimpic", "federacion deportiva", "competicion"],
    ),
    (
        "Agricultura, ganadería y pesca",
        &[
            "agricultur", "agrari", "agricola", "ganader", "pesca", "pesquer", "forestal",
            "rural", "feader", "regadio",
        ],
    ),
    (
        "Medio ambiente y energía",
        &[
            "medio ambiente", "medioambiental", "energia", "renovable",
            "eficiencia energetica", "clima", "residuos", "biodiversidad", "agua",
            "descarbonizacion",
        ],
    ),
    (
        "Vivienda y urbanismo",
        &[
            "vivienda", "alquiler", "rehabilitacion de edificios", "urbanismo",
            "regeneracion urbana", "rehabilitacion residencial",
        ],
    ),
    (
        "Transporte e infraestructuras",
        &[
            "transporte", "movilidad", "infraestructura", "carretera", "ferroviari",
            "puerto", "aeropuerto", "vehiculo",
        ],
    ),
    (
        "Digitalización y telecomunicaciones",
        &[
            "digitalizacion", "kit digital", "transformacion digital", "telecomunicaciones",
            "banda ancha", "5g", "ciberseguridad", "conectividad",
        ],
    ),
    (
        "Industria, comercio y turismo",
        &[
            "industria", "industrial", "comercio", "turismo", "turistic", "pyme", "pymes",
            "internacionalizacion", "exportacion",
        ],
    ),
    (
        "Igualdad y juventud",
        &[
            "igualdad", "violencia de genero", "genero", "mujer", "mujeres", "juventud",
            "jovenes", "lgtbi", "infancia",
        ],
    ),
];

/// Sector of an already-folded description
///
/// Keywords are stems ("agrari", "museo") and match anywhere in the text.
pub fn sector_of(folded_text: &str) -> &'static str {
    first_hit(SECTORS, folded_text, |text, keyword| text.contains(keyword)).unwrap_or(DEFAULT_SECTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::fold_lower;

    #[test]
    fn test_fourteen_categories() {
        assert_eq!(SECTORS.len(), 14);
    }

    #[test]
    fn test_first_match_wins() {
        // both research and education keywords; research is checked first
        let text = fold_lower("Ayudas para la formación de personal investigador (investigación)");
        assert_eq!(sector_of(&text), "Investigación, desarrollo e innovación");
    }

    #[test]
    fn test_stems_match_inside_words() {
        let agrarian = fold_lower("Ayudas al sector agrario");
        assert_eq!(sector_of(&agrarian), "Agricultura, ganadería y pesca");
        assert_eq!(sector_of(&fold_lower("Subvenciones a museos")), "Cultura y patrimonio");
        assert_eq!(sector_of(&fold_lower("Programa de teatros")), "Cultura y patrimonio");
        assert_eq!(sector_of("despliegue de redes 5g"), "Digitalización y telecomunicaciones");
    }

    #[test]
    fn test_default_sector() {
        assert_eq!(sector_of("convocatoria generica"), DEFAULT_SECTOR);
    }
}
