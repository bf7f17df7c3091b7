// レガシーXMLスキーマリーダー
//
// MDB2形式のXMLスキーマ定義を読み込み、Schema に変換します。
// 名前に含まれる `*dbprefix*` は設定されたテーブルプレフィックスに置換します。

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::core::error::ReaderError;
use crate::core::naming::PREFIX_PLACEHOLDER;
use crate::core::platform::Platform;
use crate::core::schema::{
    Column, ColumnDefault, ColumnType, ForeignKey, Index, ReferentialAction, Schema, Sequence,
    Table,
};

/// XML要素（テキストと子要素のみ保持）
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn text(&self) -> &str {
        self.text.trim()
    }
}

/// スキーマリーダー
#[derive(Debug, Clone)]
pub struct SchemaReader {
    platform: Platform,
    prefix: String,
}

impl SchemaReader {
    /// 新しいSchemaReaderを作成
    ///
    /// # Arguments
    /// * `platform` - 対象プラットフォーム
    /// * `prefix` - `*dbprefix*` を置換するテーブルプレフィックス
    pub fn new(platform: Platform, prefix: &str) -> Self {
        Self {
            platform,
            prefix: prefix.to_string(),
        }
    }

    /// ファイルからスキーマを読み込む
    pub fn read_file(&self, path: &Path) -> Result<Schema, ReaderError> {
        let xml = std::fs::read_to_string(path).map_err(|source| ReaderError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.read_str(&xml)
    }

    /// 文字列からスキーマを読み込む
    pub fn read_str(&self, xml: &str) -> Result<Schema, ReaderError> {
        let root = parse_tree(xml)?;
        if root.name != "database" {
            return Err(ReaderError::parse(&root.name, "expected <database> root element"));
        }

        let mut schema = Schema::new();
        for child in &root.children {
            match child.name.as_str() {
                "name" | "create" | "overwrite" | "charset" => {}
                "table" => {
                    let table = self.read_table(child)?;
                    if schema.has_table(&table.name) {
                        return Err(ReaderError::parse(
                            "table",
                            format!("table '{}' already exists", table.name),
                        ));
                    }
                    schema.add_table(table);
                }
                "sequence" => {
                    let sequence = self.read_sequence(child)?;
                    schema.create_sequence(sequence)?;
                }
                other => return Err(unknown_element(other, "database")),
            }
        }
        Ok(schema)
    }

    fn substitute(&self, name: &str) -> String {
        name.replace(PREFIX_PLACEHOLDER, &self.prefix)
    }

    fn read_table(&self, element: &Element) -> Result<Table, ReaderError> {
        let mut name = None;
        let mut comment = None;
        let mut declaration = None;

        for child in &element.children {
            match child.name.as_str() {
                "name" => name = Some(self.substitute(child.text())),
                "create" | "overwrite" | "charset" | "was" => {}
                "comment" => comment = Some(child.text().to_string()),
                "declaration" => declaration = Some(child),
                other => return Err(unknown_element(other, "table")),
            }
        }

        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ReaderError::parse("table", "table without a name"))?;
        let mut table = Table::new(&name);
        table.comment = comment.filter(|c| !c.is_empty());

        let Some(declaration) = declaration else {
            return Ok(table);
        };

        for child in &declaration.children {
            match child.name.as_str() {
                "field" => self.read_field(child, &mut table)?,
                "index" => self.read_index(child, &mut table)?,
                "foreign" => self.read_foreign_key(child, &mut table)?,
                other => return Err(unknown_element(other, "declaration")),
            }
        }

        apply_autoincrement_primary_key(&mut table)?;
        Ok(table)
    }

    fn read_field(&self, element: &Element, table: &mut Table) -> Result<(), ReaderError> {
        let mut name = None;
        let mut type_name = None;
        let mut length: Option<String> = None;
        let mut default: Option<String> = None;
        let mut notnull = false;
        let mut autoincrement = false;
        let mut unsigned = false;
        let mut primary = false;
        let mut comment = None;
        let mut precision = None;
        let mut scale = None;

        for child in &element.children {
            let text = child.text();
            match child.name.as_str() {
                "name" => name = Some(text.to_string()),
                "type" => type_name = Some(text.to_string()),
                "length" => length = Some(text.to_string()),
                "default" => default = Some(text.to_string()),
                "notnull" => notnull = as_bool(text),
                "autoincrement" => autoincrement = as_bool(text),
                "unsigned" => unsigned = as_bool(text),
                "primary" => primary = as_bool(text),
                "comments" => comment = Some(text.to_string()),
                "precision" => precision = Some(parse_number(text, "precision")?),
                "scale" => scale = Some(parse_number(text, "scale")?),
                "fixed" | "was" | "description" => {}
                other => return Err(unknown_element(other, "field")),
            }
        }

        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ReaderError::parse("field", format!("field without a name in table '{}'", table.name)))?;
        let type_name = type_name.ok_or_else(|| {
            ReaderError::parse("field", format!("field '{}' has no type", name))
        })?;

        let length = match length.as_deref() {
            None | Some("") => None,
            // decimal の長さは "precision,scale" 形式を許容する
            Some(value) if value.contains(',') => {
                let (p, s) = value.split_once(',').unwrap_or((value, ""));
                precision = precision.or(Some(parse_number(p.trim(), "length")?));
                scale = scale.or(Some(parse_number(s.trim(), "length")?));
                None
            }
            Some(value) => Some(parse_number(value, "length")?),
        };

        let column_type = map_type(&type_name, length, &name)?;
        let mut column = Column::new(&name, column_type, !notnull);

        match column_type {
            ColumnType::STRING => column.length = length,
            ColumnType::DECIMAL => {
                column.precision = precision.or(length);
                column.scale = scale.or(column.precision.map(|_| 0));
            }
            _ => {}
        }

        // 符号なしはMySQLのみが表現できる
        column.unsigned = unsigned && column_type.is_integer() && self.platform == Platform::MySQL;
        column.comment = comment.filter(|c| !c.is_empty());
        column.default = default.and_then(|raw| coerce_default(column_type, &raw));

        if autoincrement {
            column = column.with_autoincrement();
            column.default = None;
        }

        table.add_column(column)?;
        if primary {
            ensure_no_primary_key(table, &name)?;
            table.set_primary_key(&[name.as_str()], None)?;
        }
        Ok(())
    }

    fn read_index(&self, element: &Element, table: &mut Table) -> Result<(), ReaderError> {
        let mut name = None;
        let mut primary = false;
        let mut unique = false;
        let mut columns = Vec::new();

        for child in &element.children {
            match child.name.as_str() {
                "name" => name = Some(self.substitute(child.text())),
                "primary" => primary = as_bool(child.text()),
                "unique" => unique = as_bool(child.text()),
                "field" => {
                    for field_child in &child.children {
                        match field_child.name.as_str() {
                            "name" => columns.push(field_child.text().to_string()),
                            "sorting" => {}
                            other => return Err(unknown_element(other, "index field")),
                        }
                    }
                }
                other => return Err(unknown_element(other, "index")),
            }
        }

        let name = name.unwrap_or_default();
        if columns.is_empty() {
            return Err(ReaderError::parse(
                "index",
                format!("index '{}' on table '{}' has no fields", name, table.name),
            ));
        }

        if primary {
            ensure_no_primary_key(table, &name)?;
            let column_refs: Vec<&str> = columns.iter().map(String::as_str).collect();
            let pk_name = (!name.is_empty()).then_some(name.as_str());
            table.set_primary_key(&column_refs, pk_name)?;
        } else {
            table.push_index(Index::new(&name, columns, unique))?;
        }
        Ok(())
    }

    fn read_foreign_key(&self, element: &Element, table: &mut Table) -> Result<(), ReaderError> {
        let mut name = None;
        let mut columns = Vec::new();
        let mut referenced_table = None;
        let mut referenced_columns = Vec::new();
        let mut on_delete = None;
        let mut on_update = None;

        for child in &element.children {
            match child.name.as_str() {
                "name" => name = Some(self.substitute(child.text())),
                "field" => columns.push(child.text().to_string()),
                "references" => {
                    for reference in &child.children {
                        match reference.name.as_str() {
                            "table" => referenced_table = Some(self.substitute(reference.text())),
                            "field" => referenced_columns.push(reference.text().to_string()),
                            other => return Err(unknown_element(other, "references")),
                        }
                    }
                }
                "ondelete" => on_delete = parse_action(child.text(), "ondelete")?,
                "onupdate" => on_update = parse_action(child.text(), "onupdate")?,
                other => return Err(unknown_element(other, "foreign")),
            }
        }

        let referenced_table = referenced_table.ok_or_else(|| {
            ReaderError::parse("foreign", format!("foreign key on '{}' has no referenced table", table.name))
        })?;
        if columns.is_empty() || columns.len() != referenced_columns.len() {
            return Err(ReaderError::parse(
                "foreign",
                format!("foreign key on '{}' has mismatched field lists", table.name),
            ));
        }

        let name = name.unwrap_or_else(|| format!("{}_{}_fk", table.name, columns.join("_")));
        let mut foreign_key = ForeignKey::new(&name, columns, &referenced_table, referenced_columns);
        foreign_key.on_delete = on_delete;
        foreign_key.on_update = on_update;
        table.add_foreign_key(foreign_key)?;
        Ok(())
    }

    fn read_sequence(&self, element: &Element) -> Result<Sequence, ReaderError> {
        let mut name = None;
        let mut start = None;
        let mut owner: Option<(String, String)> = None;

        for child in &element.children {
            match child.name.as_str() {
                "name" => name = Some(self.substitute(child.text())),
                "start" => {
                    start = Some(child.text().parse::<i64>().map_err(|_| {
                        ReaderError::parse("start", format!("invalid sequence start '{}'", child.text()))
                    })?)
                }
                "on" => {
                    let mut on_table = String::new();
                    let mut on_field = String::new();
                    for on_child in &child.children {
                        match on_child.name.as_str() {
                            "table" => on_table = self.substitute(on_child.text()),
                            "field" => on_field = on_child.text().to_string(),
                            other => return Err(unknown_element(other, "on")),
                        }
                    }
                    owner = Some((on_table, on_field));
                }
                other => return Err(unknown_element(other, "sequence")),
            }
        }

        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ReaderError::parse("sequence", "sequence without a name"))?;
        let mut sequence = Sequence::new(&name);
        if let Some(start) = start {
            sequence.start = start;
        }
        if let Some((table, column)) = owner {
            sequence = sequence.owned_by(&table, &column);
        }
        Ok(sequence)
    }
}

/// 主キーが未宣言であることを確認
fn ensure_no_primary_key(table: &Table, declared_by: &str) -> Result<(), ReaderError> {
    if table.has_primary_key() {
        return Err(ReaderError::parse(
            "primary",
            format!(
                "table '{}' already has a primary key before '{}'",
                table.name, declared_by
            ),
        ));
    }
    Ok(())
}

/// 自動採番フィールドを単一カラム主キーとして扱う
///
/// 自動採番フィールドは1テーブルに1つまでで、
/// 別のカラムを含む主キーとは共存できません。
fn apply_autoincrement_primary_key(table: &mut Table) -> Result<(), ReaderError> {
    let mut autoincrement = table.columns.iter().filter(|c| c.autoincrement);
    let Some(first) = autoincrement.next() else {
        return Ok(());
    };
    if let Some(second) = autoincrement.next() {
        return Err(ReaderError::parse(
            "autoincrement",
            format!(
                "table '{}' already has autoincrement field '{}' before '{}'",
                table.name, first.name, second.name
            ),
        ));
    }

    let column = first.name.clone();
    if table.is_sole_primary_key_column(&column) {
        return Ok(());
    }
    if table.has_primary_key() {
        return Err(ReaderError::parse(
            "primary",
            format!(
                "primary key of table '{}' conflicts with autoincrement field '{}'",
                table.name, column
            ),
        ));
    }
    table.set_primary_key(&[column.as_str()], None)?;
    Ok(())
}

/// XML文字列を要素ツリーに変換
fn parse_tree(xml: &str) -> Result<Element, ReaderError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        let current = stack.last().map(|e| e.name.clone()).unwrap_or_default();
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            ReaderError::parse(
                &current,
                format!("XML error at position {}: {}", reader.buffer_position(), e),
            )
        })?;

        match event {
            Event::Eof => break,
            Event::Start(ref e) => {
                stack.push(Element {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    ..Default::default()
                });
            }
            Event::Empty(ref e) => {
                let element = Element {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    ..Default::default()
                };
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ReaderError::parse(&current, "unexpected closing tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(ref e) => {
                let text = e
                    .unescape()
                    .map_err(|err| ReaderError::parse(&current, err.to_string()))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Event::CData(ref e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            // コメント、処理命令、XML宣言は無視
            _ => {}
        }

        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(ReaderError::parse(&open.name, "element is not closed"));
    }
    root.ok_or_else(|| ReaderError::parse("database", "document has no root element"))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ReaderError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(ReaderError::parse(&element.name, "multiple root elements")),
    }
    Ok(())
}

fn unknown_element(name: &str, parent: &str) -> ReaderError {
    ReaderError::parse(name, format!("unknown element inside <{}>", parent))
}

/// 真偽値の解釈（空は false）
fn as_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

fn parse_number(value: &str, element: &str) -> Result<u32, ReaderError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| ReaderError::parse(element, format!("invalid number '{}'", value)))
}

fn parse_action(value: &str, element: &str) -> Result<Option<ReferentialAction>, ReaderError> {
    if value.is_empty() {
        return Ok(None);
    }
    ReferentialAction::parse(value)
        .map(Some)
        .ok_or_else(|| ReaderError::parse(element, format!("unknown referential action '{}'", value)))
}

/// XMLの型名を論理型に変換
fn map_type(type_name: &str, length: Option<u32>, field: &str) -> Result<ColumnType, ReaderError> {
    let column_type = match type_name.trim().to_ascii_lowercase().as_str() {
        "integer" => match length {
            Some(l) if l < 4 => ColumnType::SMALLINT,
            Some(l) if l > 4 => ColumnType::BIGINT,
            _ => ColumnType::INTEGER,
        },
        "text" => ColumnType::STRING,
        "clob" => ColumnType::TEXT,
        "timestamp" | "datetime" => ColumnType::DATETIME,
        "date" => ColumnType::DATE,
        "time" => ColumnType::TIME,
        "boolean" => ColumnType::BOOLEAN,
        "numeric" | "decimal" => ColumnType::DECIMAL,
        "float" => ColumnType::FLOAT,
        "blob" => ColumnType::BLOB,
        "json" => ColumnType::JSON,
        _ => {
            return Err(ReaderError::UnsupportedType {
                type_name: type_name.to_string(),
                field: field.to_string(),
            })
        }
    };
    Ok(column_type)
}

/// 宣言されたデフォルト値をカラム型に合わせて変換
fn coerce_default(column_type: ColumnType, raw: &str) -> Option<ColumnDefault> {
    if column_type.is_integer() {
        if raw.trim().is_empty() {
            return None;
        }
        return Some(match raw.trim().parse::<i64>() {
            Ok(value) => ColumnDefault::Integer(value),
            Err(_) => ColumnDefault::Text(raw.to_string()),
        });
    }

    match column_type {
        ColumnType::BOOLEAN if raw.trim().is_empty() => None,
        ColumnType::BOOLEAN => Some(ColumnDefault::Boolean(as_bool(raw))),
        ColumnType::STRING | ColumnType::TEXT => Some(ColumnDefault::Text(raw.to_string())),
        _ if raw.trim().is_empty() => None,
        _ => Some(ColumnDefault::Text(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> SchemaReader {
        SchemaReader::new(Platform::MySQL, "oc_")
    }

    // =========================================================================
    // 型とデフォルト値
    // =========================================================================

    #[test]
    fn test_map_integer_length() {
        assert_eq!(map_type("integer", Some(2), "f").unwrap(), ColumnType::SMALLINT);
        assert_eq!(map_type("integer", Some(4), "f").unwrap(), ColumnType::INTEGER);
        assert_eq!(map_type("integer", None, "f").unwrap(), ColumnType::INTEGER);
        assert_eq!(map_type("integer", Some(8), "f").unwrap(), ColumnType::BIGINT);
    }

    #[test]
    fn test_map_unknown_type() {
        let err = map_type("enum", None, "state").unwrap_err();
        assert!(err.is_unsupported_type());
    }

    #[test]
    fn test_coerce_default() {
        assert_eq!(
            coerce_default(ColumnType::INTEGER, "10"),
            Some(ColumnDefault::Integer(10))
        );
        assert_eq!(
            coerce_default(ColumnType::BOOLEAN, "true"),
            Some(ColumnDefault::Boolean(true))
        );
        assert_eq!(
            coerce_default(ColumnType::BOOLEAN, "0"),
            Some(ColumnDefault::Boolean(false))
        );
        assert_eq!(coerce_default(ColumnType::INTEGER, ""), None);
        assert_eq!(
            coerce_default(ColumnType::STRING, ""),
            Some(ColumnDefault::Text(String::new()))
        );
    }

    #[test]
    fn test_as_bool() {
        assert!(as_bool("true"));
        assert!(as_bool("1"));
        assert!(!as_bool("false"));
        assert!(!as_bool(""));
    }

    // =========================================================================
    // 読み込み
    // =========================================================================

    #[test]
    fn test_prefix_substitution_and_foreign_key() {
        let xml = r#"<?xml version="1.0"?>
<database>
  <name>*dbname*</name>
  <table>
    <name>*dbprefix*shares</name>
    <declaration>
      <field><name>id</name><type>integer</type><notnull>true</notnull></field>
      <field><name>uid</name><type>text</type><length>64</length></field>
      <foreign>
        <name>*dbprefix*shares_uid_fk</name>
        <field>uid</field>
        <references><table>*dbprefix*users</table><field>uid</field></references>
        <ondelete>cascade</ondelete>
      </foreign>
    </declaration>
  </table>
</database>"#;

        let schema = reader().read_str(xml).unwrap();
        let table = schema.get_table("oc_shares").unwrap();
        let fk = &table.foreign_keys[0];
        assert_eq!(fk.name, "oc_shares_uid_fk");
        assert_eq!(fk.referenced_table, "oc_users");
        assert_eq!(fk.on_delete, Some(ReferentialAction::Cascade));
    }

    #[test]
    fn test_decimal_length_with_scale() {
        let xml = r#"<database><table><name>t</name><declaration>
            <field><name>price</name><type>decimal</type><length>12,2</length></field>
        </declaration></table></database>"#;
        let schema = reader().read_str(xml).unwrap();
        let column = schema.get_table("t").unwrap().get_column("price").unwrap();
        assert_eq!(column.precision, Some(12));
        assert_eq!(column.scale, Some(2));
    }

    #[test]
    fn test_unsigned_only_kept_on_mysql() {
        let xml = r#"<database><table><name>t</name><declaration>
            <field><name>n</name><type>integer</type><unsigned>true</unsigned></field>
        </declaration></table></database>"#;
        let mysql = reader().read_str(xml).unwrap();
        assert!(mysql.get_table("t").unwrap().get_column("n").unwrap().unsigned);

        let pg = SchemaReader::new(Platform::PostgreSQL, "oc_").read_str(xml).unwrap();
        assert!(!pg.get_table("t").unwrap().get_column("n").unwrap().unsigned);
    }

    #[test]
    fn test_unknown_element_is_parse_error() {
        let xml = r#"<database><table><name>t</name><bogus/></table></database>"#;
        let err = reader().read_str(xml).unwrap_err();
        match err {
            ReaderError::Parse { element, .. } => assert_eq!(element, "bogus"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        let err = reader()
            .read_str("<database><table><name>t</name></database>")
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_index_without_fields_names_index() {
        let xml = r#"<database><table><name>t</name><declaration>
            <field><name>a</name><type>integer</type></field>
            <index><name>empty_idx</name></index>
        </declaration></table></database>"#;
        let err = reader().read_str(xml).unwrap_err();
        assert!(err.to_string().contains("empty_idx"));
    }

    #[test]
    fn test_sequence_with_owner() {
        let xml = r#"<database>
            <sequence><name>*dbprefix*jobs_seq</name><start>5</start>
              <on><table>*dbprefix*jobs</table><field>id</field></on>
            </sequence>
        </database>"#;
        let schema = reader().read_str(xml).unwrap();
        let sequence = schema.get_sequence("oc_jobs_seq").unwrap();
        assert_eq!(sequence.start, 5);
        assert_eq!(sequence.table.as_deref(), Some("oc_jobs"));
        assert_eq!(sequence.column.as_deref(), Some("id"));
    }
}
