use crate::error::RenderError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const VEHICLE_ROWS: usize = 4;
pub const CREW_ROWS: usize = 6;
pub const PLATE_SLOTS: usize = 5;

/// Typology checklists as (key, printed label), in form order.
pub const PREVENTION_ITEMS: [(&str, &str); 5] = [
    ("deportivo", "Evento deportivo"),
    ("cultural", "Evento cultural"),
    ("festejos", "Festejos populares"),
    ("religioso", "Acto religioso"),
    ("otros", "Otros preventivos"),
];

pub const INTERVENTION_ITEMS: [(&str, &str); 6] = [
    ("incendio", "Incendio"),
    ("accidente_trafico", "Accidente de tráfico"),
    ("rescate", "Rescate"),
    ("inundacion", "Inundación"),
    ("asistencia_sanitaria", "Asistencia sanitaria"),
    ("busqueda_personas", "Búsqueda de personas"),
];

pub const OTHER_ITEMS: [(&str, &str); 5] = [
    ("apoyo_servicios", "Apoyo a otros servicios"),
    ("formacion", "Formación"),
    ("simulacro", "Simulacro"),
    ("mantenimiento", "Mantenimiento"),
    ("otros", "Otros"),
];

/// The report snapshot handed to the renderer. Field names follow the JSON the
/// report form produces. A missing key and an explicit `null` both fall back to
/// the field default, so a bare `{}` is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub numero: String,
    #[serde(deserialize_with = "null_as_default")]
    pub fecha: String,
    #[serde(deserialize_with = "null_as_default")]
    pub hora: String,

    #[serde(deserialize_with = "null_as_default")]
    pub lugar: String,
    #[serde(deserialize_with = "null_as_default")]
    pub motivo: String,
    #[serde(deserialize_with = "null_as_default")]
    pub alertante: String,
    #[serde(deserialize_with = "null_as_default")]
    pub otros_descripcion: String,
    #[serde(deserialize_with = "null_as_default")]
    pub posibles_causas: String,
    #[serde(deserialize_with = "null_as_default")]
    pub observaciones: String,
    #[serde(deserialize_with = "null_as_default")]
    pub desarrollo_detallado: String,

    #[serde(deserialize_with = "null_as_default")]
    pub tiempos: Checkpoints,

    #[serde(deserialize_with = "vec_null_as_default")]
    pub vehiculos: Vec<VehicleRow>,
    #[serde(deserialize_with = "vec_null_as_default")]
    pub personal: Vec<CrewRow>,
    #[serde(deserialize_with = "vec_null_as_default")]
    pub personal_refuerzo: Vec<CrewRow>,

    #[serde(deserialize_with = "null_as_default")]
    pub tipologia: Typology,

    #[serde(deserialize_with = "null_as_default")]
    pub heridos_si: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub heridos_no: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub num_heridos: String,
    #[serde(deserialize_with = "null_as_default")]
    pub fallecidos_si: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub fallecidos_no: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub num_fallecidos: String,

    #[serde(deserialize_with = "vec_null_as_default")]
    pub matriculas: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub autoridad_interviniente: String,
    #[serde(deserialize_with = "null_as_default")]
    pub policia_local: String,
    #[serde(deserialize_with = "null_as_default")]
    pub guardia_civil: String,

    #[serde(deserialize_with = "null_as_default")]
    pub firmas: Signatures,

    #[serde(deserialize_with = "vec_null_as_default")]
    pub fotos: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checkpoints {
    #[serde(deserialize_with = "null_as_default")]
    pub llamada: String,
    #[serde(deserialize_with = "null_as_default")]
    pub salida: String,
    #[serde(deserialize_with = "null_as_default")]
    pub llegada: String,
    #[serde(deserialize_with = "null_as_default")]
    pub terminado: String,
    #[serde(deserialize_with = "null_as_default")]
    pub disponible: String,
}

impl Checkpoints {
    /// The five checkpoints in strip order, with their printed labels.
    pub fn labeled(&self) -> [(&'static str, &str); 5] {
        [
            ("Llamada", self.llamada.as_str()),
            ("Salida", self.salida.as_str()),
            ("Llegada", self.llegada.as_str()),
            ("Terminado", self.terminado.as_str()),
            ("Disponible", self.disponible.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleRow {
    #[serde(deserialize_with = "null_as_default")]
    pub vehiculo: String,
    #[serde(deserialize_with = "null_as_default")]
    pub componente: String,
    #[serde(deserialize_with = "null_as_default")]
    pub emisora: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrewRow {
    #[serde(deserialize_with = "null_as_default")]
    pub componente: String,
    #[serde(deserialize_with = "null_as_default")]
    pub emisora: String,
}

/// Checked typology keys. Keys missing from a map are unchecked; keys outside
/// the fixed catalogues are kept but never drawn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Typology {
    #[serde(deserialize_with = "flags_null_as_false")]
    pub prevencion: BTreeMap<String, bool>,
    #[serde(deserialize_with = "flags_null_as_false")]
    pub intervencion: BTreeMap<String, bool>,
    #[serde(deserialize_with = "flags_null_as_false")]
    pub otros: BTreeMap<String, bool>,
}

pub fn is_checked(map: &BTreeMap<String, bool>, key: &str) -> bool {
    map.get(key).copied().unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signatures {
    #[serde(deserialize_with = "null_as_default")]
    pub informante: String,
    #[serde(deserialize_with = "null_as_default")]
    pub informante_firma: String,
    #[serde(deserialize_with = "null_as_default")]
    pub jefe_turno: String,
    #[serde(deserialize_with = "null_as_default")]
    pub jefe_turno_firma: String,
    #[serde(deserialize_with = "null_as_default")]
    pub jefe_servicio: String,
    #[serde(deserialize_with = "null_as_default")]
    pub jefe_servicio_firma: String,
}

/// One signature column: role label, identity text and encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureSlot<'a> {
    pub key: &'static str,
    pub role: &'static str,
    pub identity: &'a str,
    pub image: &'a str,
}

impl Signatures {
    pub fn slots(&self) -> [SignatureSlot<'_>; 3] {
        [
            SignatureSlot {
                key: "informante",
                role: "Informante",
                identity: self.informante.as_str(),
                image: self.informante_firma.as_str(),
            },
            SignatureSlot {
                key: "jefe_turno",
                role: "Jefe de turno",
                identity: self.jefe_turno.as_str(),
                image: self.jefe_turno_firma.as_str(),
            },
            SignatureSlot {
                key: "jefe_servicio",
                role: "Jefe de servicio",
                identity: self.jefe_servicio.as_str(),
                image: self.jefe_servicio_firma.as_str(),
            },
        ]
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// `null` for the whole list and for single entries.
fn vec_null_as_default<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let entries = Option::<Vec<Option<T>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries.into_iter().map(Option::unwrap_or_default).collect())
}

fn flags_null_as_false<'de, D>(deserializer: D) -> Result<BTreeMap<String, bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let flags = Option::<BTreeMap<String, Option<bool>>>::deserialize(deserializer)?;
    Ok(flags
        .unwrap_or_default()
        .into_iter()
        .map(|(key, checked)| (key, checked.unwrap_or(false)))
        .collect())
}

impl ReportRecord {
    pub fn from_json(data: &str) -> Result<Self, RenderError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn from_json_slice(data: &[u8]) -> Result<Self, RenderError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Photo entries that carry data, in input order. Blank entries are skipped.
    pub fn photo_entries(&self) -> Vec<&str> {
        self.fotos
            .iter()
            .map(|photo| photo.trim())
            .filter(|photo| !photo.is_empty())
            .collect()
    }

    pub fn has_photos(&self) -> bool {
        self.fotos.iter().any(|photo| !photo.trim().is_empty())
    }

    /// Report number, or `None` when it has not been assigned yet.
    pub fn number(&self) -> Option<&str> {
        let numero = self.numero.trim();
        (!numero.is_empty()).then_some(numero)
    }

    /// The five licence-plate slots; missing entries are blank, extras dropped.
    pub fn plates(&self) -> [&str; PLATE_SLOTS] {
        let mut plates = [""; PLATE_SLOTS];
        for (slot, plate) in plates.iter_mut().zip(&self.matriculas) {
            *slot = plate.as_str();
        }
        plates
    }

    pub fn vehicle_rows(&self) -> Vec<Vec<&str>> {
        self.vehiculos
            .iter()
            .map(|row| {
                vec![
                    row.vehiculo.as_str(),
                    row.componente.as_str(),
                    row.emisora.as_str(),
                ]
            })
            .collect()
    }

    pub fn crew_rows(rows: &[CrewRow]) -> Vec<Vec<&str>> {
        rows.iter()
            .map(|row| vec![row.componente.as_str(), row.emisora.as_str()])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let record = ReportRecord::from_json("{}").expect("empty record");
        assert_eq!(record, ReportRecord::default());
        assert!(!record.has_photos());
        assert_eq!(record.number(), None);
        assert_eq!(record.plates(), [""; 5]);
    }

    #[test]
    fn parses_form_payload() {
        let json = r#"{
            "numero": "PSI-2024-001",
            "fecha": "2024-05-01",
            "tiempos": { "llamada": "14:20", "disponible": "15:15" },
            "vehiculos": [{ "vehiculo": "UMJ-1", "componente": "Ana" }],
            "tipologia": { "intervencion": { "incendio": true, "rescate": false } },
            "heridos_si": true,
            "matriculas": ["1234ABC"],
            "firmas": { "informante": "Ana Ruiz" },
            "campo_desconocido": 1
        }"#;
        let record = ReportRecord::from_json(json).expect("record");
        assert_eq!(record.number(), Some("PSI-2024-001"));
        assert_eq!(record.tiempos.llamada, "14:20");
        assert_eq!(record.tiempos.salida, "");
        assert_eq!(record.vehiculos[0].emisora, "");
        assert!(is_checked(&record.tipologia.intervencion, "incendio"));
        assert!(!is_checked(&record.tipologia.intervencion, "rescate"));
        assert!(!is_checked(&record.tipologia.prevencion, "deportivo"));
        assert!(record.heridos_si);
        assert_eq!(record.plates()[0], "1234ABC");
        assert_eq!(record.firmas.slots()[0].identity, "Ana Ruiz");
    }

    #[test]
    fn explicit_nulls_fall_back_to_defaults() {
        let json = r#"{
            "numero": null,
            "heridos_si": null,
            "tiempos": { "llamada": null, "salida": "14:25" },
            "vehiculos": [null, { "vehiculo": "UMJ-1", "emisora": null }],
            "personal": null,
            "tipologia": {
                "prevencion": null,
                "intervencion": { "incendio": null, "rescate": true }
            },
            "matriculas": [null, "1234ABC"],
            "firmas": { "informante": "Ana Ruiz", "informante_firma": null },
            "fotos": [null, "abc"]
        }"#;
        let record = ReportRecord::from_json(json).expect("record");
        assert_eq!(record.number(), None);
        assert!(!record.heridos_si);
        assert_eq!(record.tiempos.llamada, "");
        assert_eq!(record.tiempos.salida, "14:25");
        assert_eq!(record.vehiculos[0], VehicleRow::default());
        assert_eq!(record.vehiculos[1].vehiculo, "UMJ-1");
        assert!(record.personal.is_empty());
        assert!(!is_checked(&record.tipologia.intervencion, "incendio"));
        assert!(is_checked(&record.tipologia.intervencion, "rescate"));
        assert_eq!(&record.plates()[..2], &["", "1234ABC"]);
        assert_eq!(record.firmas.informante_firma, "");
        assert_eq!(record.photo_entries(), vec!["abc"]);

        let all_null =
            ReportRecord::from_json(r#"{"tiempos": null, "firmas": null, "fotos": null}"#)
                .expect("nulls");
        assert_eq!(all_null, ReportRecord::default());
    }

    #[test]
    fn malformed_json_is_a_record_error() {
        let err = ReportRecord::from_json("{\"fotos\": 3}").expect_err("bad type");
        assert!(matches!(err, RenderError::Record(_)));
    }

    #[test]
    fn blank_photo_entries_are_ignored() {
        let record = ReportRecord {
            fotos: vec!["".into(), "  ".into(), "abc".into(), "".into()],
            ..ReportRecord::default()
        };
        assert!(record.has_photos());
        assert_eq!(record.photo_entries(), vec!["abc"]);

        let blank = ReportRecord {
            fotos: vec!["".into(), " ".into()],
            ..ReportRecord::default()
        };
        assert!(!blank.has_photos());
    }

    #[test]
    fn catalogues_have_fixed_sizes() {
        assert_eq!(PREVENTION_ITEMS.len(), 5);
        assert_eq!(INTERVENTION_ITEMS.len(), 6);
        assert_eq!(OTHER_ITEMS.len(), 5);
    }

    #[test]
    fn extra_plates_are_dropped() {
        let record = ReportRecord {
            matriculas: (0..7).map(|i| format!("P{i}")).collect(),
            ..ReportRecord::default()
        };
        assert_eq!(record.plates(), ["P0", "P1", "P2", "P3", "P4"]);
    }
}
