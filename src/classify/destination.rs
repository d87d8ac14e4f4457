use super::{first_hit, KeywordTable};
use crate::models::AdministrativeLevel;
use crate::text::matches_keyword;

/// Domestic fallback when nothing else applies
pub const DEFAULT_DESTINATION: &str = "España";

/// Label for generic international-cooperation phrases
pub const INTERNATIONAL_COOPERATION: &str = "Cooperación Internacional";

/// Country dictionaries; compound names precede their prefixes
pub const COUNTRIES: &KeywordTable = &[
    ("Afganistán", &["afganistan", "afgano", "afgana"]),
    ("Albania", &["albania"]),
    ("Angola", &["angola"]),
    ("Argelia", &["argelia", "argelino", "argelina"]),
    ("Argentina", &["argentina"]),
    ("Armenia", &["armenia"]),
    ("Bangladés", &["banglades", "bangladesh"]),
    ("Benín", &["benin"]),
    ("Bolivia", &["bolivia"]),
    ("Bosnia y Herzegovina", &["bosnia", "herzegovina"]),
    ("Brasil", &["brasil", "brasileno", "brasilena"]),
    ("Burkina Faso", &["burkina"]),
    ("Burundi", &["burundi"]),
    ("Cabo Verde", &["cabo verde", "caboverdian"]),
    ("Camboya", &["camboya"]),
    ("Camerún", &["camerun"]),
    ("Chad", &["chad"]),
    ("Chile", &["chile", "chileno", "chilena"]),
    ("China", &["china"]),
    ("Colombia", &["colombia"]),
    ("Costa de Marfil", &["costa de marfil", "marfileno"]),
    ("Costa Rica", &["costa rica", "costarricense"]),
    ("Cuba", &["cuba", "cubano", "cubana"]),
    ("Ecuador", &["ecuador", "ecuatoriano", "ecuatoriana"]),
    ("Egipto", &["egipto", "egipcio", "egipcia"]),
    ("El Salvador", &["el salvador", "salvadoreno", "salvadorena"]),
    ("Eritrea", &["eritrea"]),
    ("Etiopía", &["etiopia", "etiope"]),
    ("Filipinas", &["filipinas"]),
    ("Gambia", &["gambia"]),
    ("Georgia", &["georgia"]),
    ("Ghana", &["ghana"]),
    ("Guatemala", &["guatemala", "guatemalteco", "guatemalteca"]),
    ("Guinea Ecuatorial", &["guinea ecuatorial", "ecuatoguinean"]),
    ("Guinea-Bisáu", &["guinea-bisau", "guinea bisau", "guinea bissau"]),
    ("Guinea", &["guinea", "guineano", "guineana"]),
    ("Haití", &["haiti", "haitiano", "haitiana"]),
    ("Honduras", &["honduras", "hondureno", "hondurena"]),
    ("India", &["india"]),
    ("Indonesia", &["indonesia"]),
    ("Irak", &["irak", "iraq", "iraqui"]),
    ("Irán", &["iran", "irani"]),
    ("Jordania", &["jordania", "jordano", "jordana"]),
    ("Kenia", &["kenia", "kenya", "keniano"]),
    ("Kosovo", &["kosovo"]),
    ("Laos", &["laos"]),
    ("Líbano", &["libano", "libanes", "libanesa"]),
    ("Liberia", &["liberia"]),
    ("Libia", &["libia", "libio"]),
    ("Madagascar", &["madagascar", "malgache"]),
    ("Malaui", &["malaui", "malawi"]),
    ("Mali", &["mali", "maliense"]),
    ("Marruecos", &["marruecos", "marroqui"]),
    ("Mauritania", &["mauritania", "mauritano", "mauritana"]),
    ("México", &["mexico", "mexicano", "mexicana"]),
    ("Moldavia", &["moldavia", "moldova"]),
    ("Mozambique", &["mozambique"]),
    ("Myanmar", &["myanmar", "birmania"]),
    ("Namibia", &["namibia"]),
    ("Nepal", &["nepal", "nepali"]),
    ("Nicaragua", &["nicaragua", "nicaraguense"]),
    ("Níger", &["niger"]),
    ("Nigeria", &["nigeria"]),
    ("Pakistán", &["pakistan", "pakistani"]),
    ("Palestina", &["palestina", "palestino", "gaza", "cisjordania"]),
    ("Panamá", &["panama", "panameno", "panamena"]),
    ("Paraguay", &["paraguay", "paraguayo", "paraguaya"]),
    ("Perú", &["peru", "peruano", "peruana"]),
    ("República Centroafricana", &["republica centroafricana", "centroafricana"]),
    ("República Democrática del Congo", &["republica democratica del congo", "r.d. congo", "rdc"]),
    ("Congo", &["congo", "congoleno", "congolena"]),
    ("República Dominicana", &["republica dominicana", "dominicano", "dominicana"]),
    ("Ruanda", &["ruanda", "rwanda"]),
    ("Sáhara Occidental", &["sahara occidental", "saharaui", "tinduf"]),
    ("Senegal", &["senegal", "senegales", "senegalesa"]),
    ("Serbia", &["serbia"]),
    ("Sierra Leona", &["sierra leona"]),
    ("Siria", &["siria", "sirio"]),
    ("Somalia", &["somalia"]),
    ("Sri Lanka", &["sri lanka"]),
    ("Sudáfrica", &["sudafrica", "sudafricano", "sudafricana"]),
    ("Sudán del Sur", &["sudan del sur"]),
    ("Sudán", &["sudan", "sudanes", "sudanesa"]),
    ("Tailandia", &["tailandia"]),
    ("Tanzania", &["tanzania"]),
    ("Timor Oriental", &["timor"]),
    ("Togo", &["togo"]),
    ("Túnez", &["tunez", "tunecino", "tunecina"]),
    ("Turquía", &["turquia"]),
    ("Ucrania", &["ucrania", "ucraniano", "ucraniana"]),
    ("Uganda", &["uganda"]),
    ("Uruguay", &["uruguay"]),
    ("Venezuela", &["venezuela", "venezolano", "venezolana"]),
    ("Vietnam", &["vietnam"]),
    ("Yemen", &["yemen"]),
    ("Zambia", &["zambia"]),
    ("Zimbabue", &["zimbabue", "zimbabwe"]),
];

/// Regional dictionaries, checked after every country
pub const REGIONS: &KeywordTable = &[
    ("Norte de África", &["norte de africa", "magreb", "mediterraneo sur"]),
    (
        "África Subsahariana",
        &["africa subsahariana", "subsahariana", "africa occidental", "africa oriental",
          "africa central", "sahel", "africa"],
    ),
    ("Oriente Medio", &["oriente medio", "oriente proximo", "medio oriente"]),
    (
        "América Latina",
        &["america latina", "latinoamerica", "iberoamerica", "centroamerica", "caribe",
          "sudamerica", "america del sur"],
    ),
    ("Asia", &["sudeste asiatico", "asia-pacifico", "asia"]),
    ("Europa del Este", &["europa del este", "europa oriental", "balcanes"]),
    ("Oceanía", &["oceania", "islas del pacifico"]),
];

/// Generic phrases that mark a subsidy as international without a place
pub const COOPERATION_PHRASES: &[&str] = &[
    "cooperacion internacional",
    "cooperacion al desarrollo",
    "ayuda oficial al desarrollo",
    "paises en desarrollo",
    "paises empobrecidos",
    "accion humanitaria",
    "ayuda humanitaria",
    "emergencia humanitaria",
    "accion exterior",
    "terceros paises",
    "aecid",
];

/// Destination of an already-folded description
///
/// Tier order: country, region, generic cooperation phrase, domestic label
/// from the administrative level, bare domestic default.
pub fn destination_of(folded_text: &str, level: AdministrativeLevel) -> &'static str {
    if let Some(country) = first_hit(COUNTRIES, folded_text, matches_keyword) {
        return country;
    }
    if let Some(region) = first_hit(REGIONS, folded_text, matches_keyword) {
        return region;
    }
    if COOPERATION_PHRASES
        .iter()
        .any(|p| matches_keyword(folded_text, p))
    {
        return INTERNATIONAL_COOPERATION;
    }
    match level {
        AdministrativeLevel::Estado => "España - Estatal",
        AdministrativeLevel::Autonomica => "España - Autonómica",
        AdministrativeLevel::Local => "España - Local",
        AdministrativeLevel::Otros => DEFAULT_DESTINATION,
    }
}
