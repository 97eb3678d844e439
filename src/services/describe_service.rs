use std::sync::Arc;

use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

use crate::database::models::TableInfo;
use crate::database::{DatabaseError, SchemaCatalog};

#[derive(Debug, Error)]
pub enum DescribeError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("XML rendering error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl DescribeError {
    /// `<error>` document sent in place of the schema when describing fails
    pub fn to_xml(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<error>Could not read the database structure: {}</error>",
            escape(self.to_string().as_str())
        )
    }
}

/// Dumps the live table layout as XML
#[derive(Clone)]
pub struct DescribeService {
    catalog: Arc<dyn SchemaCatalog>,
}

impl DescribeService {
    pub fn new(catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self { catalog }
    }

    pub async fn schema_xml(&self) -> Result<String, DescribeError> {
        let tables = self.catalog.tables().await?;
        render_xml(&tables)
    }
}

pub fn render_xml(tables: &[TableInfo]) -> Result<String, DescribeError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("database")))?;

    for table in tables {
        let mut start = BytesStart::new("table");
        start.push_attribute(("name", table.name.as_str()));
        writer.write_event(Event::Start(start))?;

        for column in &table.columns {
            writer.write_event(Event::Start(BytesStart::new("column")))?;
            text_element(&mut writer, "name", &column.name)?;
            text_element(&mut writer, "type", &column.data_type)?;
            text_element(&mut writer, "nullable", yes_no(column.nullable))?;
            if column.primary_key {
                text_element(&mut writer, "primary_key", "YES")?;
            }
            writer.write_event(Event::End(BytesEnd::new("column")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("table")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("database")))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn text_element(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> Result<(), DescribeError> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "YES"
    } else {
        "NO"
    }
}
