//! PASCAL-VOC style annotation files.

use contracts::{BoundingBox, BoundingBoxSet};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{RecorderError, Result};

type XmlWriter = Writer<Vec<u8>>;

/// Serialize a box set as an `<annotation>` document
pub fn write_voc(boxes: &BoundingBoxSet, filename: &str) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    open(&mut writer, "annotation")?;
    text_element(&mut writer, "filename", filename)?;

    open(&mut writer, "size")?;
    text_element(&mut writer, "width", &boxes.width.to_string())?;
    text_element(&mut writer, "height", &boxes.height.to_string())?;
    text_element(&mut writer, "depth", &boxes.depth.to_string())?;
    close(&mut writer, "size")?;
    text_element(&mut writer, "segmented", "0")?;

    for bbox in &boxes.boxes {
        open(&mut writer, "object")?;
        text_element(&mut writer, "name", &bbox.class_name)?;
        text_element(&mut writer, "pose", "Unspecified")?;
        text_element(&mut writer, "truncated", "0")?;
        text_element(&mut writer, "difficult", "0")?;
        open(&mut writer, "bndbox")?;
        text_element(&mut writer, "xmin", &bbox.xmin.to_string())?;
        text_element(&mut writer, "ymin", &bbox.ymin.to_string())?;
        text_element(&mut writer, "xmax", &bbox.xmax.to_string())?;
        text_element(&mut writer, "ymax", &bbox.ymax.to_string())?;
        close(&mut writer, "bndbox")?;
        close(&mut writer, "object")?;
    }

    close(&mut writer, "annotation")?;
    Ok(writer.into_inner())
}

fn emit(writer: &mut XmlWriter, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| RecorderError::encode("bounding_box.xml", e.to_string()))
}

fn open(writer: &mut XmlWriter, name: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))
}

fn close(writer: &mut XmlWriter, name: &str) -> Result<()> {
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn text_element(writer: &mut XmlWriter, name: &str, value: &str) -> Result<()> {
    open(writer, name)?;
    emit(writer, Event::Text(BytesText::new(value)))?;
    close(writer, name)
}

#[derive(Default)]
struct PartialBox {
    name: Option<String>,
    xmin: Option<f64>,
    ymin: Option<f64>,
    xmax: Option<f64>,
    ymax: Option<f64>,
}

impl PartialBox {
    fn finish(self) -> Result<BoundingBox> {
        let missing = |field: &str| RecorderError::annotation(format!("object without <{}>", field));
        Ok(BoundingBox {
            class_name: self.name.ok_or_else(|| missing("name"))?,
            xmin: self.xmin.ok_or_else(|| missing("xmin"))?,
            ymin: self.ymin.ok_or_else(|| missing("ymin"))?,
            xmax: self.xmax.ok_or_else(|| missing("xmax"))?,
            ymax: self.ymax.ok_or_else(|| missing("ymax"))?,
        })
    }
}

/// Load a `bounding_box.xml` document
pub fn parse_voc(xml: &str) -> Result<BoundingBoxSet> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut size = (None, None, None);
    let mut current: Option<PartialBox> = None;
    let mut boxes = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if path.is_empty() {
                    if name != "annotation" {
                        return Err(RecorderError::annotation(format!(
                            "root element is <{}>, expected <annotation>",
                            name
                        )));
                    }
                    seen_root = true;
                }
                if name == "object" && path.len() == 1 {
                    current = Some(PartialBox::default());
                }
                path.push(name);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                path.pop();
                if name == "object" && path.len() == 1 {
                    if let Some(partial) = current.take() {
                        boxes.push(partial.finish()?);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| RecorderError::annotation(err.to_string()))?;
                let segments: Vec<&str> = path.iter().map(String::as_str).collect();
                match segments.as_slice() {
                    ["annotation", "size", "width"] => size.0 = Some(parse_number(&text)?),
                    ["annotation", "size", "height"] => size.1 = Some(parse_number(&text)?),
                    ["annotation", "size", "depth"] => size.2 = Some(parse_number(&text)?),
                    ["annotation", "object", "name"] => {
                        if let Some(partial) = current.as_mut() {
                            partial.name = Some(text.into_owned());
                        }
                    }
                    ["annotation", "object", "bndbox", field] => {
                        if let Some(partial) = current.as_mut() {
                            let value = Some(parse_coordinate(&text)?);
                            match *field {
                                "xmin" => partial.xmin = value,
                                "ymin" => partial.ymin = value,
                                "xmax" => partial.xmax = value,
                                "ymax" => partial.ymax = value,
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(RecorderError::annotation(format!("xml parse error: {}", e))),
            _ => {}
        }
    }

    if !seen_root {
        return Err(RecorderError::annotation("empty document"));
    }
    match size {
        (Some(width), Some(height), Some(depth)) => {
            Ok(BoundingBoxSet::new(width, height, depth, boxes))
        }
        _ => Err(RecorderError::annotation("missing <size> dimensions")),
    }
}

fn parse_number(text: &str) -> Result<u32> {
    text.trim()
        .parse()
        .map_err(|_| RecorderError::annotation(format!("'{}' is not an image dimension", text)))
}

fn parse_coordinate(text: &str) -> Result<f64> {
    text.trim()
        .parse()
        .map_err(|_| RecorderError::annotation(format!("'{}' is not a coordinate", text)))
}
