//! KML 2.2 export.
//!
//! One point placemark at the pour point, then one polygon placemark per
//! catchment polygon with a blue outline and a faint blue fill.

use crate::error::Result;
use geo::{LineString, Polygon};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use std::path::Path;

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// KML colours are `aabbggrr`
const LINE_COLOR: &str = "ffff0000";
const FILL_COLOR: &str = "14ff0000";
const LINE_WIDTH: u32 = 1;

fn start<W: Write>(writer: &mut Writer<W>, tag: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    Ok(())
}

fn end<W: Write>(writer: &mut Writer<W>, tag: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// `<tag>text</tag>`, with `text` escaped by the writer
fn text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> Result<()> {
    start(writer, tag)?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    end(writer, tag)
}

fn coordinates(ring: &LineString<f64>) -> String {
    ring.coords()
        .map(|c| format!("{},{},0", c.x, c.y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_ring<W: Write>(writer: &mut Writer<W>, boundary: &str, ring: &LineString<f64>) -> Result<()> {
    start(writer, boundary)?;
    start(writer, "LinearRing")?;
    text_element(writer, "coordinates", &coordinates(ring))?;
    end(writer, "LinearRing")?;
    end(writer, boundary)
}

fn write_style<W: Write>(writer: &mut Writer<W>) -> Result<()> {
    start(writer, "Style")?;
    start(writer, "LineStyle")?;
    text_element(writer, "color", LINE_COLOR)?;
    text_element(writer, "width", &LINE_WIDTH.to_string())?;
    end(writer, "LineStyle")?;
    start(writer, "PolyStyle")?;
    text_element(writer, "color", FILL_COLOR)?;
    end(writer, "PolyStyle")?;
    end(writer, "Style")
}

/// Render the document. `pour_point` is (lon, lat).
pub fn document(name: &str, pour_point: (f64, f64), polygons: &[Polygon<f64>]) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("kml").with_attributes([("xmlns", KML_NAMESPACE)]),
    ))?;
    start(&mut writer, "Document")?;

    start(&mut writer, "Placemark")?;
    text_element(&mut writer, "name", &format!("Watershed Calculation Point - {name}"))?;
    start(&mut writer, "Point")?;
    text_element(
        &mut writer,
        "coordinates",
        &format!("{},{},0", pour_point.0, pour_point.1),
    )?;
    end(&mut writer, "Point")?;
    end(&mut writer, "Placemark")?;

    for polygon in polygons {
        start(&mut writer, "Placemark")?;
        text_element(&mut writer, "name", &format!("Watershed - {name}"))?;
        write_style(&mut writer)?;
        start(&mut writer, "Polygon")?;
        write_ring(&mut writer, "outerBoundaryIs", polygon.exterior())?;
        for hole in polygon.interiors() {
            write_ring(&mut writer, "innerBoundaryIs", hole)?;
        }
        end(&mut writer, "Polygon")?;
        end(&mut writer, "Placemark")?;
    }

    end(&mut writer, "Document")?;
    end(&mut writer, "kml")?;
    Ok(writer.into_inner().into_inner())
}

pub async fn write(
    path: &Path,
    name: &str,
    pour_point: (f64, f64),
    polygons: &[Polygon<f64>],
) -> Result<()> {
    tokio::fs::write(path, document(name, pour_point, polygons)?).await?;
    Ok(())
}
