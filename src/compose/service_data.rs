use super::{ComposeContext, META_SIGNATURE, place_image, require_space, text_area};
use crate::canvas::Canvas;
use crate::draw::{TextStyle, draw_box, labeled_field, outline, place_text};
use crate::error::RenderError;
use crate::record::{
    CREW_ROWS, INTERVENTION_ITEMS, OTHER_ITEMS, PLATE_SLOTS, PREVENTION_ITEMS, ReportRecord,
    SignatureSlot, VEHICLE_ROWS, is_checked,
};
use crate::sections::{ResourceTable, checkbox, page_footer, page_header, section_bar};
use crate::theme::Theme;
use crate::types::Rect;
use std::collections::BTreeMap;

const FIELD_HEIGHT: f32 = 7.5;
const FIELD_GAP: f32 = 0.5;
const TABLE_ROW_HEIGHT: f32 = 4.5;
const IDENTIFICATION_WIDTH: f32 = 80.0;
const CHECKPOINT_HEIGHT: f32 = 9.0;
const TYPOLOGY_TITLE_HEIGHT: f32 = 5.0;
const TYPOLOGY_ROW_HEIGHT: f32 = 4.5;
const FREE_TEXT_HEIGHT: f32 = 16.0;
const CASUALTY_HEIGHT: f32 = 9.0;
const TRAFFIC_FIELD_HEIGHT: f32 = 9.0;
const OBSERVATIONS_HEIGHT: f32 = 30.0;
const SIGNATURE_ROLE_HEIGHT: f32 = 4.5;
const SIGNATURE_IDENTITY_HEIGHT: f32 = 7.0;
const SIGNATURE_MAX_HEIGHT: f32 = 30.0;
const SIGNATURE_MIN_HEIGHT: f32 = 10.0;

const VEHICLE_TABLE: ResourceTable<'static> = ResourceTable {
    key: "vehiculos",
    headers: &["Vehículo", "Componente", "Emisora"],
    weights: &[1.0, 1.3, 1.0],
    capacity: VEHICLE_ROWS,
    row_height: TABLE_ROW_HEIGHT,
};

const CREW_TABLE: ResourceTable<'static> = ResourceTable {
    key: "personal",
    headers: &["Personal", "Emisora"],
    weights: &[1.6, 1.0],
    capacity: CREW_ROWS,
    row_height: TABLE_ROW_HEIGHT,
};

const REINFORCEMENT_TABLE: ResourceTable<'static> = ResourceTable {
    key: "personal_refuerzo",
    headers: &["Refuerzo", "Emisora"],
    weights: &[1.6, 1.0],
    capacity: CREW_ROWS,
    row_height: TABLE_ROW_HEIGHT,
};

/// Page 1: identification, resources, checkpoints, typology, casualties,
/// traffic accident, observations and signatures.
pub(crate) fn compose_service_data(
    canvas: &mut Canvas,
    ctx: &ComposeContext<'_>,
    record: &ReportRecord,
) -> Result<(), RenderError> {
    let theme = ctx.theme;
    let mut y = page_header(canvas, theme, ctx.brand);

    y = section_bar(canvas, theme, "DATOS DEL SERVICIO", y) + 1.0;
    y = identification_block(canvas, theme, record, y)? + theme.block_gap;

    y = section_bar(canvas, theme, "TIEMPOS", y) + 1.0;
    y = checkpoint_strip(canvas, theme, record, y) + theme.block_gap;

    y = section_bar(canvas, theme, "TIPOLOGÍA DEL SERVICIO", y) + 1.0;
    y = typology_grid(canvas, theme, record, y) + theme.block_gap;

    let half = (theme.content_width() - theme.block_gap) / 2.0;
    let left = theme.content_left();
    text_area(
        canvas,
        theme,
        "Otros (descripción)",
        &record.otros_descripcion,
        Rect::new(left, y, half, FREE_TEXT_HEIGHT),
    );
    text_area(
        canvas,
        theme,
        "Posibles causas",
        &record.posibles_causas,
        Rect::new(left + half + theme.block_gap, y, half, FREE_TEXT_HEIGHT),
    );
    y += FREE_TEXT_HEIGHT + theme.block_gap;

    y = casualty_block(canvas, theme, record, y) + theme.block_gap;

    y = section_bar(canvas, theme, "ACCIDENTE DE TRÁFICO", y) + 1.0;
    y = traffic_block(canvas, theme, record, y) + theme.block_gap;

    text_area(
        canvas,
        theme,
        "Observaciones",
        &record.observaciones,
        Rect::new(left, y, theme.content_width(), OBSERVATIONS_HEIGHT),
    );
    y += OBSERVATIONS_HEIGHT + theme.block_gap;

    y = section_bar(canvas, theme, "FIRMAS", y) + 1.0;
    signature_block(canvas, ctx, record, y)?;

    page_footer(canvas, theme, ctx.brand);
    Ok(())
}

fn identification_block(
    canvas: &mut Canvas,
    theme: &Theme,
    record: &ReportRecord,
    top: f32,
) -> Result<f32, RenderError> {
    let left = theme.content_left();
    let width = IDENTIFICATION_WIDTH.min(theme.content_width() * 0.45);

    let third = (width - FIELD_GAP * 2.0) / 3.0;
    let head = [
        ("Fecha", record.fecha.as_str()),
        ("Hora", record.hora.as_str()),
        ("Nº de parte", record.numero.as_str()),
    ];
    for (index, (label, value)) in head.into_iter().enumerate() {
        let x = left + (third + FIELD_GAP) * index as f32;
        let rect = Rect::new(x, top, third, FIELD_HEIGHT);
        labeled_field(canvas, theme, label, value, rect);
    }
    let mut y = top + FIELD_HEIGHT + FIELD_GAP;
    for (label, value) in [
        ("Lugar", record.lugar.as_str()),
        ("Motivo", record.motivo.as_str()),
        ("Alertante", record.alertante.as_str()),
    ] {
        let rect = Rect::new(left, y, width, FIELD_HEIGHT);
        labeled_field(canvas, theme, label, value, rect);
        y += FIELD_HEIGHT + FIELD_GAP;
    }
    let fields_bottom = y - FIELD_GAP;

    let tables_left = left + width + theme.block_gap;
    let tables_width = theme.content_right() - tables_left - theme.block_gap * 2.0;
    require_space("resource tables", tables_width)?;
    let vehicle_width = tables_width * 0.38;
    let crew_width = (tables_width - vehicle_width) / 2.0;

    let mut x = tables_left;
    let mut bottom = fields_bottom;
    let crew = ReportRecord::crew_rows(&record.personal);
    let reinforcement = ReportRecord::crew_rows(&record.personal_refuerzo);
    for (table, rows, table_width) in [
        (&VEHICLE_TABLE, record.vehicle_rows(), vehicle_width),
        (&CREW_TABLE, crew, crew_width),
        (&REINFORCEMENT_TABLE, reinforcement, crew_width),
    ] {
        bottom = bottom.max(table.draw(canvas, theme, x, top, table_width, &rows));
        x += table_width + theme.block_gap;
    }
    Ok(bottom)
}

fn checkpoint_strip(canvas: &mut Canvas, theme: &Theme, record: &ReportRecord, top: f32) -> f32 {
    let checkpoints = record.tiempos.labeled();
    let count = checkpoints.len() as f32;
    let width = (theme.content_width() - theme.block_gap * (count - 1.0)) / count;
    for (index, (label, value)) in checkpoints.into_iter().enumerate() {
        let x = theme.content_left() + (width + theme.block_gap) * index as f32;
        let rect = Rect::new(x, top, width, CHECKPOINT_HEIGHT);
        labeled_field(canvas, theme, label, value, rect);
    }
    top + CHECKPOINT_HEIGHT
}

fn typology_grid(canvas: &mut Canvas, theme: &Theme, record: &ReportRecord, top: f32) -> f32 {
    let columns: [(&str, &str, &[(&str, &str)], &BTreeMap<String, bool>); 3] = [
        (
            "prevencion",
            "Prevención",
            &PREVENTION_ITEMS,
            &record.tipologia.prevencion,
        ),
        (
            "intervencion",
            "Intervención",
            &INTERVENTION_ITEMS,
            &record.tipologia.intervencion,
        ),
        ("otros", "Otros", &OTHER_ITEMS, &record.tipologia.otros),
    ];
    let rows = columns
        .iter()
        .map(|(_, _, items, _)| items.len())
        .max()
        .unwrap_or(0);
    let height = TYPOLOGY_TITLE_HEIGHT + TYPOLOGY_ROW_HEIGHT * rows as f32;
    let width = (theme.content_width() - theme.block_gap * 2.0) / 3.0;
    let item_style = TextStyle::value(theme);

    for (index, (group, title, items, selection)) in columns.into_iter().enumerate() {
        let x = theme.content_left() + (width + theme.block_gap) * index as f32;
        let column = Rect::new(x, top, width, height);
        let title_band = Rect::new(x, top, width, TYPOLOGY_TITLE_HEIGHT);
        draw_box(canvas, theme, title_band, Some(theme.background), None);
        outline(canvas, theme, column);
        place_text(canvas, theme, title, title_band, &TextStyle::label(theme));
        let box_x = column.right() - 1.5 - theme.checkbox_size;
        for (row, (key, label)) in items.iter().enumerate() {
            let row_top = top + TYPOLOGY_TITLE_HEIGHT + TYPOLOGY_ROW_HEIGHT * row as f32;
            let row_rect = Rect::new(x, row_top, box_x - x, TYPOLOGY_ROW_HEIGHT);
            place_text(canvas, theme, label, row_rect, &item_style);
            let box_y = row_top + (TYPOLOGY_ROW_HEIGHT - theme.checkbox_size) / 2.0;
            checkbox(
                canvas,
                theme,
                box_x,
                box_y,
                is_checked(selection, key),
                &format!("{group}.{key}"),
            );
        }
    }
    top + height
}

fn casualty_block(canvas: &mut Canvas, theme: &Theme, record: &ReportRecord, top: f32) -> f32 {
    let width = (theme.content_width() - theme.block_gap) / 2.0;
    let groups = [
        (
            "heridos",
            "Heridos",
            record.heridos_si,
            record.heridos_no,
            record.num_heridos.as_str(),
        ),
        (
            "fallecidos",
            "Fallecidos",
            record.fallecidos_si,
            record.fallecidos_no,
            record.num_fallecidos.as_str(),
        ),
    ];
    let label_style = TextStyle::label(theme);
    let value_style = TextStyle::value(theme);
    let box_y = top + (CASUALTY_HEIGHT - theme.checkbox_size) / 2.0;

    for (index, (key, title, yes, no, count)) in groups.into_iter().enumerate() {
        let x = theme.content_left() + (width + theme.block_gap) * index as f32;
        let rect = Rect::new(x, top, width, CASUALTY_HEIGHT);
        outline(canvas, theme, rect);
        let title_rect = Rect::new(x, top, 24.0, CASUALTY_HEIGHT);
        place_text(canvas, theme, title, title_rect, &label_style);

        let mut cursor = x + 24.0;
        for (mark, label, checked) in [("si", "Sí", yes), ("no", "No", no)] {
            let label_rect = Rect::new(cursor, top, 8.0, CASUALTY_HEIGHT);
            place_text(canvas, theme, label, label_rect, &value_style);
            let mark_key = format!("{key}.{mark}");
            checkbox(canvas, theme, cursor + 7.0, box_y, checked, &mark_key);
            cursor += 16.0;
        }

        let count_label = Rect::new(cursor, top, 8.0, CASUALTY_HEIGHT);
        place_text(canvas, theme, "Nº", count_label, &label_style);
        let count_rect = Rect::new(
            cursor + 8.0,
            top + 1.5,
            rect.right() - cursor - 9.5,
            CASUALTY_HEIGHT - 3.0,
        );
        outline(canvas, theme, count_rect);
        place_text(canvas, theme, count, count_rect, &value_style);
    }
    top + CASUALTY_HEIGHT
}

fn traffic_block(canvas: &mut Canvas, theme: &Theme, record: &ReportRecord, top: f32) -> f32 {
    let gap = theme.block_gap;
    let slots = PLATE_SLOTS as f32;
    let plate_width = (theme.content_width() - gap * (slots - 1.0)) / slots;
    for (index, plate) in record.plates().into_iter().enumerate() {
        let x = theme.content_left() + (plate_width + gap) * index as f32;
        labeled_field(
            canvas,
            theme,
            &format!("Matrícula {}", index + 1),
            plate,
            Rect::new(x, top, plate_width, TRAFFIC_FIELD_HEIGHT),
        );
    }

    let y = top + TRAFFIC_FIELD_HEIGHT + FIELD_GAP * 3.0;
    let authorities = [
        ("Autoridad interviniente", record.autoridad_interviniente.as_str()),
        ("Policía Local", record.policia_local.as_str()),
        ("Guardia Civil", record.guardia_civil.as_str()),
    ];
    let width = (theme.content_width() - gap * 2.0) / 3.0;
    for (index, (label, value)) in authorities.into_iter().enumerate() {
        let x = theme.content_left() + (width + gap) * index as f32;
        let rect = Rect::new(x, y, width, TRAFFIC_FIELD_HEIGHT);
        labeled_field(canvas, theme, label, value, rect);
    }
    y + TRAFFIC_FIELD_HEIGHT
}

fn signature_block(
    canvas: &mut Canvas,
    ctx: &ComposeContext<'_>,
    record: &ReportRecord,
    top: f32,
) -> Result<(), RenderError> {
    let theme = ctx.theme;
    let image_top = top + SIGNATURE_ROLE_HEIGHT + SIGNATURE_IDENTITY_HEIGHT + 1.0;
    let available = theme.body_rect().bottom() - image_top;
    require_space("signature block", available - SIGNATURE_MIN_HEIGHT + f32::EPSILON)?;
    let image_height = available.min(SIGNATURE_MAX_HEIGHT);
    let width = (theme.content_width() - theme.block_gap * 2.0) / 3.0;

    for (index, slot) in record.firmas.slots().into_iter().enumerate() {
        let x = theme.content_left() + (width + theme.block_gap) * index as f32;
        place_text(
            canvas,
            theme,
            slot.role,
            Rect::new(x, top, width, SIGNATURE_ROLE_HEIGHT),
            &TextStyle::label(theme),
        );
        let identity = Rect::new(
            x,
            top + SIGNATURE_ROLE_HEIGHT,
            width,
            SIGNATURE_IDENTITY_HEIGHT,
        );
        outline(canvas, theme, identity);
        place_text(canvas, theme, slot.identity, identity, &TextStyle::value(theme));

        let placeholder = Rect::new(x, image_top, width, image_height);
        outline(canvas, theme, placeholder);
        signature_image(canvas, ctx, &slot, placeholder);
    }
    Ok(())
}

/// A signature that fails to decode leaves its placeholder undecorated.
fn signature_image(
    canvas: &mut Canvas,
    ctx: &ComposeContext<'_>,
    slot: &SignatureSlot<'_>,
    placeholder: Rect,
) {
    if slot.image.trim().is_empty() {
        canvas.meta(META_SIGNATURE, format!("{}=empty", slot.key));
        return;
    }
    match ctx.decode_asset(&format!("firma.{}", slot.key), slot.image) {
        Ok(image) => {
            let resource_id = format!("signature:{}", slot.key);
            place_image(canvas, &resource_id, image, placeholder.inset(1.0));
            canvas.meta(META_SIGNATURE, format!("{}=embedded", slot.key));
        }
        Err(err) => {
            canvas.meta(META_SIGNATURE, format!("{}=failed:{}", slot.key, err.as_str()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::BrandAssets;
    use crate::assets::fixtures::png_data_uri;
    use crate::canvas::{Command, Document};
    use crate::record::{CrewRow, Signatures, VehicleRow};
    use crate::sections::{META_CHECKBOX, META_TABLE};
    use std::collections::BTreeSet;

    fn render(record: &ReportRecord) -> Document {
        let theme = Theme::default();
        let brand = BrandAssets::bundled().expect("brand");
        let ctx = ComposeContext {
            theme: &theme,
            brand: &brand,
            debug: None,
        };
        let mut canvas = Canvas::new(theme.page_size());
        compose_service_data(&mut canvas, &ctx, record).expect("compose");
        canvas.finish()
    }

    #[test]
    fn empty_record_fills_one_page() {
        let doc = render(&ReportRecord::default());
        assert_eq!(doc.page_count(), 1);
        let page = &doc.pages[0];
        assert_eq!(page.meta_values(META_CHECKBOX).count(), 16 + 4);
        assert!(page.meta_values(META_CHECKBOX).all(|v| v.ends_with("=0")));
        assert_eq!(
            page.meta_values(META_SIGNATURE).collect::<Vec<_>>(),
            vec!["informante=empty", "jefe_turno=empty", "jefe_servicio=empty"]
        );
    }

    #[test]
    fn checkboxes_follow_typology_maps() {
        let mut record = ReportRecord::default();
        record.tipologia.prevencion.insert("festejos".into(), true);
        record.tipologia.intervencion.insert("incendio".into(), true);
        record.tipologia.intervencion.insert("rescate".into(), false);
        record.tipologia.otros.insert("simulacro".into(), true);
        record.tipologia.otros.insert("desconocido".into(), true);
        record.heridos_no = true;

        let doc = render(&record);
        let checked: BTreeSet<&str> = doc.pages[0]
            .meta_values(META_CHECKBOX)
            .filter_map(|v| v.strip_suffix("=1"))
            .collect();
        let expected: BTreeSet<&str> = [
            "prevencion.festejos",
            "intervencion.incendio",
            "otros.simulacro",
            "heridos.no",
        ]
        .into_iter()
        .collect();
        assert_eq!(checked, expected);
    }

    #[test]
    fn typology_titles_sit_on_background_bands() {
        let theme = Theme::default();
        let doc = render(&ReportRecord::default());
        let bands = doc.pages[0]
            .commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::SetFillColor(c) if *c == theme.background))
            .count();
        assert_eq!(bands, 3);
    }

    #[test]
    fn resource_tables_truncate_silently() {
        let mut record = ReportRecord::default();
        record.vehiculos = (0..9)
            .map(|i| VehicleRow {
                vehiculo: format!("V{i}"),
                ..Default::default()
            })
            .collect();
        record.personal = (0..10)
            .map(|i| CrewRow {
                componente: format!("C{i}"),
                emisora: String::new(),
            })
            .collect();
        let doc = render(&record);
        assert_eq!(doc.page_count(), 1);
        let page = &doc.pages[0];
        assert_eq!(
            page.meta_values(META_TABLE).collect::<Vec<_>>(),
            vec!["vehiculos:4/4", "personal:6/6", "personal_refuerzo:0/6"]
        );
        let texts: Vec<&str> = page.texts().collect();
        assert!(texts.contains(&"V3") && !texts.contains(&"V4"));
        assert!(texts.contains(&"C5") && !texts.contains(&"C6"));
    }

    #[test]
    fn corrupt_signature_does_not_affect_the_others() {
        let record = ReportRecord {
            firmas: Signatures {
                informante: "Ana Ruiz".into(),
                informante_firma: png_data_uri(40, 20, [0, 0, 0, 255]),
                jefe_turno_firma: "data:image/png;base64,@@@@".into(),
                jefe_servicio_firma: png_data_uri(30, 10, [10, 10, 10, 255]),
                ..Signatures::default()
            },
            ..ReportRecord::default()
        };
        let doc = render(&record);
        let page = &doc.pages[0];
        assert_eq!(
            page.meta_values(META_SIGNATURE).collect::<Vec<_>>(),
            vec![
                "informante=embedded",
                "jefe_turno=failed:base64",
                "jefe_servicio=embedded"
            ]
        );
        let draws: Vec<&str> = page.image_draws().collect();
        assert!(draws.contains(&"signature:informante"));
        assert!(draws.contains(&"signature:jefe_servicio"));
        assert!(!draws.contains(&"signature:jefe_turno"));
        assert!(doc.images.contains_key("signature:informante"));
        assert!(page.texts().any(|t| t == "Ana Ruiz"));
    }

    #[test]
    fn scenario_fields_are_printed() {
        let record = ReportRecord::from_json(
            r#"{
                "fecha": "2024-05-01", "hora": "14:30",
                "numero": "PSI-2024-001", "lugar": "Plaza Mayor",
                "tiempos": {
                    "llamada": "14:20", "salida": "14:25", "llegada": "14:35",
                    "terminado": "15:10", "disponible": "15:15"
                }
            }"#,
        )
        .expect("record");
        let doc = render(&record);
        let texts: BTreeSet<&str> = doc.pages[0].texts().collect();
        for value in [
            "2024-05-01",
            "14:30",
            "PSI-2024-001",
            "Plaza Mayor",
            "14:20",
            "14:25",
            "14:35",
            "15:10",
            "15:15",
        ] {
            assert!(texts.contains(value), "missing {value}");
        }
    }

    #[test]
    fn cramped_theme_is_a_layout_error() {
        let theme = Theme {
            footer_height: 60.0,
            ..Theme::default()
        };
        let brand = BrandAssets::bundled().expect("brand");
        let ctx = ComposeContext {
            theme: &theme,
            brand: &brand,
            debug: None,
        };
        let mut canvas = Canvas::new(theme.page_size());
        let err = compose_service_data(&mut canvas, &ctx, &ReportRecord::default())
            .expect_err("no room for signatures");
        assert!(matches!(err, RenderError::Layout(_)));
    }
}
