use anyhow::{Context, Result};
use serde::de::{DeserializeOwned, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// String-keyed map that remembers document order.
#[derive(Debug, Clone)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces. A replaced key keeps its original position.
    pub fn insert(&mut self, key: String, value: V) {
        if let Some(&slot) = self.index.get(&key) {
            self.entries[slot].1 = value;
            return;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn get_key_value(&self, key: &str) -> Option<(&str, &V)> {
        self.index.get(key).map(|&slot| {
            let (k, v) = &self.entries[slot];
            (k.as_str(), v)
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

pub type BlockMap = OrderedMap<Block>;

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub targets: Vec<Target>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub monitors: Vec<Monitor>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub meta: Option<Meta>,
}

impl Project {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid project.json: not a Scratch 3 project document.")
    }

    pub fn stage(&self) -> Option<&Target> {
        self.targets.iter().find(|t| t.is_stage)
    }

    pub fn sprites(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter().filter(|t| !t.is_stage)
    }

    pub fn sprite(&self, name: &str) -> Option<&Target> {
        self.sprites().find(|t| t.name == name)
    }

    /// Stage first, then sprites in document order.
    pub fn ordered_targets(&self) -> Vec<&Target> {
        let mut ordered: Vec<&Target> = self.targets.iter().collect();
        ordered.sort_by_key(|t| if t.is_stage { 0 } else { 1 });
        ordered
    }

    /// Every costume and sound file the project refers to, first reference wins.
    pub fn referenced_assets(&self) -> Vec<AssetRef> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for target in &self.targets {
            let costumes = target
                .costumes
                .iter()
                .map(|c| (c.md5ext(), c.name.clone(), AssetKind::Costume));
            let sounds = target
                .sounds
                .iter()
                .map(|s| (s.md5ext(), s.name.clone(), AssetKind::Sound));
            for (md5ext, name, kind) in costumes.chain(sounds) {
                if md5ext.is_empty() || !seen.insert(md5ext.clone()) {
                    continue;
                }
                out.push(AssetRef {
                    md5ext,
                    name,
                    kind,
                    target: target.name.clone(),
                });
            }
        }
        out
    }

    pub fn stats(&self) -> ProjectStats {
        let mut stats = ProjectStats {
            targets: self.targets.len(),
            sprites: self.sprites().count(),
            extensions: self.extensions.len(),
            monitors: self.monitors.len(),
            ..ProjectStats::default()
        };
        let mut broadcasts = HashSet::new();
        for target in &self.targets {
            stats.blocks += target.blocks.len();
            stats.scripts += target.blocks.values().filter(|b| b.top_level).count();
            stats.custom_blocks += count_opcode(target, "procedures_definition");
            stats.clone_blocks += count_opcode(target, "control_create_clone_of");
            broadcasts.extend(target.broadcasts.keys().map(ToString::to_string));
            stats.cloud_variables += target.variables.iter().filter(|v| v.is_cloud).count();
            if target.is_stage {
                stats.global_variables += target.variables.iter().filter(|v| !v.is_cloud).count();
            } else {
                stats.sprite_variables += target.variables.len();
            }
            stats.costumes += target.costumes.len();
            stats.sounds += target.sounds.len();
        }
        stats.broadcasts = broadcasts.len();
        stats
    }
}

impl Project {
    pub fn field_references(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for block in self.targets.iter().flat_map(|t| t.blocks.values()) {
            for id in block.fields.values().filter_map(Field::id) {
                *counts.entry(id.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn data_name(&self, id: &str) -> Option<&str> {
        self.targets.iter().find_map(|t| {
            t.variables
                .iter()
                .find(|v| v.id == id)
                .map(|v| v.name.as_str())
                .or_else(|| t.lists.iter().find(|l| l.id == id).map(|l| l.name.as_str()))
        })
    }
}

fn count_opcode(target: &Target, opcode: &str) -> usize {
    target.blocks.values().filter(|b| b.opcode == opcode).count()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectStats {
    pub targets: usize,
    pub sprites: usize,
    pub blocks: usize,
    pub scripts: usize,
    pub custom_blocks: usize,
    pub clone_blocks: usize,
    pub broadcasts: usize,
    pub cloud_variables: usize,
    pub global_variables: usize,
    pub sprite_variables: usize,
    pub costumes: usize,
    pub sounds: usize,
    pub extensions: usize,
    pub monitors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Costume,
    Sound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub md5ext: String,
    pub name: String,
    pub kind: AssetKind,
    pub target: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub semver: String,
    #[serde(default)]
    pub vm: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub opcode: String,
    #[serde(default)]
    pub sprite_name: Option<String>,
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub name: String,
    #[serde(default)]
    pub is_stage: bool,
    #[serde(default, deserialize_with = "deserialize_variables")]
    pub variables: Vec<Variable>,
    #[serde(default, deserialize_with = "deserialize_lists")]
    pub lists: Vec<ListDecl>,
    #[serde(default, deserialize_with = "deserialize_broadcasts")]
    pub broadcasts: OrderedMap<String>,
    #[serde(default, deserialize_with = "deserialize_blocks")]
    pub blocks: BlockMap,
    #[serde(default, deserialize_with = "deserialize_comments")]
    pub comments: OrderedMap<Comment>,
    #[serde(default)]
    pub current_costume: usize,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub costumes: Vec<Costume>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub sounds: Vec<Sound>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub layer_order: Option<i64>,
    #[serde(default)]
    pub tempo: Option<f64>,
    #[serde(default)]
    pub video_state: Option<String>,
    #[serde(default)]
    pub text_to_speech_language: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub direction: Option<f64>,
    #[serde(default)]
    pub draggable: Option<bool>,
    #[serde(default)]
    pub rotation_style: Option<String>,
}

impl Target {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid target JSON.")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub id: String,
    pub name: String,
    pub value: String,
    pub is_cloud: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListDecl {
    pub id: String,
    pub name: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub block_id: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Costume {
    pub name: String,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub data_format: String,
    #[serde(default)]
    pub md5ext: Option<String>,
}

impl Costume {
    pub fn md5ext(&self) -> String {
        asset_file_name(self.md5ext.as_deref(), &self.asset_id, &self.data_format)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sound {
    pub name: String,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub data_format: String,
    #[serde(default)]
    pub md5ext: Option<String>,
    #[serde(default)]
    pub rate: Option<u32>,
    #[serde(default)]
    pub sample_count: Option<u64>,
}

impl Sound {
    pub fn md5ext(&self) -> String {
        asset_file_name(self.md5ext.as_deref(), &self.asset_id, &self.data_format)
    }

    pub fn duration_secs(&self) -> Option<f64> {
        match (self.sample_count, self.rate) {
            (Some(samples), Some(rate)) if rate > 0 => Some(samples as f64 / f64::from(rate)),
            _ => None,
        }
    }
}

fn asset_file_name(md5ext: Option<&str>, asset_id: &str, data_format: &str) -> String {
    match md5ext {
        Some(name) if !name.is_empty() => name.to_string(),
        _ if asset_id.is_empty() || data_format.is_empty() => String::new(),
        _ => format!("{}.{}", asset_id, data_format),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub opcode: String,
    #[serde(default, deserialize_with = "non_empty_id")]
    pub next: Option<String>,
    #[serde(default, deserialize_with = "non_empty_id")]
    pub parent: Option<String>,
    #[serde(default, deserialize_with = "deserialize_inputs")]
    pub inputs: HashMap<String, Input>,
    #[serde(default, deserialize_with = "deserialize_fields")]
    pub fields: HashMap<String, Field>,
    #[serde(default)]
    pub top_level: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub mutation: Option<Mutation>,
}

impl Block {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).context("Invalid block JSON.")
    }

    // Reporters dropped loose on the canvas: `[12|13, name, id, x, y]`.
    fn from_loose_reporter(items: &[Value]) -> Option<Self> {
        let primitive = Primitive::from_array(items)?;
        let (opcode, field_name) = match primitive.kind {
            PrimitiveKind::Variable => ("data_variable", "VARIABLE"),
            PrimitiveKind::List => ("data_listcontents", "LIST"),
            _ => return None,
        };
        let field = match primitive.id {
            Some(id) => Field::WithId(primitive.value, id),
            None => Field::Simple(primitive.value),
        };
        Some(Block {
            opcode: opcode.to_string(),
            next: None,
            parent: None,
            inputs: HashMap::new(),
            fields: HashMap::from([(field_name.to_string(), field)]),
            top_level: true,
            mutation: None,
        })
    }
}

/// One input slot. The tag mirrors the leading discriminator in `project.json`.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    // [1, value]
    ShadowDefault(Option<InputValue>),
    // [2, value]
    NoShadow(Option<InputValue>),
    // [3, live, shadow]
    ObscuredShadow {
        live: Option<InputValue>,
        shadow: Option<InputValue>,
    },
}

impl Input {
    pub fn from_value(value: &Value) -> Option<Self> {
        let arr = value.as_array()?;
        let tag = arr.first()?.as_u64()?;
        let second = arr.get(1).and_then(InputValue::from_value);
        match tag {
            1 => Some(Input::ShadowDefault(second)),
            2 => Some(Input::NoShadow(second)),
            3 => Some(Input::ObscuredShadow {
                live: second,
                shadow: arr.get(2).and_then(InputValue::from_value),
            }),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&InputValue> {
        match self {
            Input::ShadowDefault(value) | Input::NoShadow(value) => value.as_ref(),
            Input::ObscuredShadow { live, .. } => live.as_ref(),
        }
    }

    pub fn obscured_shadow(&self) -> Option<&InputValue> {
        match self {
            Input::ObscuredShadow { shadow, .. } => shadow.as_ref(),
            _ => None,
        }
    }

    pub fn block_id(&self) -> Option<&str> {
        match self.value()? {
            InputValue::Block(id) => Some(id),
            InputValue::Primitive(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Block(String),
    Primitive(Primitive),
}

impl InputValue {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(id) => Some(InputValue::Block(id.clone())),
            Value::Array(items) => Primitive::from_array(items).map(InputValue::Primitive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Number,
    PositiveNumber,
    WholeNumber,
    Integer,
    Angle,
    Color,
    Text,
    Broadcast,
    Variable,
    List,
}

impl PrimitiveKind {
    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            4 => PrimitiveKind::Number,
            5 => PrimitiveKind::PositiveNumber,
            6 => PrimitiveKind::WholeNumber,
            7 => PrimitiveKind::Integer,
            8 => PrimitiveKind::Angle,
            9 => PrimitiveKind::Color,
            10 => PrimitiveKind::Text,
            11 => PrimitiveKind::Broadcast,
            12 => PrimitiveKind::Variable,
            13 => PrimitiveKind::List,
            _ => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Number
                | PrimitiveKind::PositiveNumber
                | PrimitiveKind::WholeNumber
                | PrimitiveKind::Integer
                | PrimitiveKind::Angle
        )
    }
}

/// `[code, value]` or, for broadcasts/variables/lists, `[code, name, id, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub value: String,
    pub id: Option<String>,
}

impl Primitive {
    pub fn from_array(items: &[Value]) -> Option<Self> {
        let kind = PrimitiveKind::from_code(items.first()?.as_u64()?)?;
        let value = display_value(items.get(1)?);
        let id = items.get(2).and_then(Value::as_str).map(ToString::to_string);
        Some(Primitive { kind, value, id })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Simple(String),
    WithId(String, String),
}

impl Field {
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(s) = value.as_str() {
            return Some(Field::Simple(s.to_string()));
        }
        let arr = value.as_array()?;
        let raw = display_value(arr.first()?);
        match arr.get(1).and_then(Value::as_str) {
            Some(id) => Some(Field::WithId(raw, id.to_string())),
            None => Some(Field::Simple(raw)),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Field::Simple(value) | Field::WithId(value, _) => value,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Field::Simple(_) => None,
            Field::WithId(_, id) => Some(id),
        }
    }
}

/// Custom-block signature carried by `procedures_prototype` and
/// `procedures_call`. The argument lists arrive as JSON text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Mutation {
    #[serde(default)]
    pub proccode: Option<String>,
    #[serde(default)]
    pub argumentids: Option<String>,
    #[serde(default)]
    pub argumentnames: Option<String>,
}

impl Mutation {
    /// `None` when the packed list is not valid JSON; absent means empty.
    pub fn argument_ids(&self) -> Option<Vec<String>> {
        decode_packed_list(self.argumentids.as_deref())
    }

    pub fn argument_names(&self) -> Option<Vec<String>> {
        decode_packed_list(self.argumentnames.as_deref())
    }
}

fn decode_packed_list(raw: Option<&str>) -> Option<Vec<String>> {
    let Some(raw) = raw else {
        return Some(Vec::new());
    };
    let items: Vec<Value> = serde_json::from_str(raw).ok()?;
    Some(items.iter().map(display_value).collect())
}

pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) => {
            debug!(%err, "dropping malformed entry");
            Ok(None)
        }
    }
}

fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                debug!(%err, "dropping malformed list entry");
                None
            }
        })
        .collect())
}

fn non_empty_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(id)) if !id.is_empty() => Some(id),
        _ => None,
    })
}

fn raw_entries<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OrderedMap<Value>, D::Error> {
    Ok(Option::<OrderedMap<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_blocks<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BlockMap, D::Error> {
    Ok(raw_entries(deserializer)?
        .into_iter()
        .filter_map(|(id, value)| {
            if let Some(items) = value.as_array() {
                let block = Block::from_loose_reporter(items);
                if block.is_none() {
                    debug!(block = %id, "dropping malformed loose reporter");
                }
                return block.map(|b| (id, b));
            }
            match serde_json::from_value::<Block>(value) {
                Ok(block) => Some((id, block)),
                Err(err) => {
                    debug!(block = %id, %err, "dropping malformed block");
                    None
                }
            }
        })
        .collect())
}

fn deserialize_inputs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<HashMap<String, Input>, D::Error> {
    Ok(raw_entries(deserializer)?
        .into_iter()
        .filter_map(|(name, value)| match Input::from_value(&value) {
            Some(input) => Some((name, input)),
            None => {
                debug!(input = %name, "dropping malformed input");
                None
            }
        })
        .collect())
}

fn deserialize_fields<'de, D: Deserializer<'de>>(deserializer: D) -> Result<HashMap<String, Field>, D::Error> {
    Ok(raw_entries(deserializer)?
        .into_iter()
        .filter_map(|(name, value)| match Field::from_value(&value) {
            Some(field) => Some((name, field)),
            None => {
                debug!(field = %name, "dropping malformed field");
                None
            }
        })
        .collect())
}

fn deserialize_variables<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Variable>, D::Error> {
    Ok(raw_entries(deserializer)?
        .into_iter()
        .filter_map(|(id, value)| {
            let arr = value.as_array()?;
            let name = arr.first()?.as_str()?.to_string();
            let value = arr.get(1).map(display_value).unwrap_or_default();
            let is_cloud = arr.get(2).and_then(Value::as_bool).unwrap_or(false);
            Some(Variable {
                id,
                name,
                value,
                is_cloud,
            })
        })
        .collect())
}

fn deserialize_lists<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ListDecl>, D::Error> {
    Ok(raw_entries(deserializer)?
        .into_iter()
        .filter_map(|(id, value)| {
            let arr = value.as_array()?;
            let name = arr.first()?.as_str()?.to_string();
            let items = arr
                .get(1)
                .and_then(Value::as_array)
                .map(|items| items.iter().map(display_value).collect())
                .unwrap_or_default();
            Some(ListDecl { id, name, items })
        })
        .collect())
}

fn deserialize_broadcasts<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OrderedMap<String>, D::Error> {
    Ok(raw_entries(deserializer)?
        .into_iter()
        .filter_map(|(id, value)| value.as_str().map(|name| (id, name.to_string())))
        .collect())
}

fn deserialize_comments<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OrderedMap<Comment>, D::Error> {
    Ok(raw_entries(deserializer)?
        .into_iter()
        .filter_map(|(id, value)| serde_json::from_value::<Comment>(value).ok().map(|c| (id, c)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blocks_keep_document_order() {
        let target = Target::from_json(
            r#"{
                "name": "Sprite1",
                "isStage": false,
                "blocks": {
                    "zz": {"opcode": "looks_show", "topLevel": true},
                    "aa": {"opcode": "looks_hide", "topLevel": true},
                    "mm": {"opcode": "pen_clear", "topLevel": true}
                }
            }"#,
        )
        .unwrap();
        let ids: Vec<&str> = target.blocks.keys().collect();
        assert_eq!(ids, vec!["zz", "aa", "mm"]);
    }

    #[test]
    fn input_descriptors_are_tagged() {
        assert_eq!(
            Input::from_value(&json!([1, [4, "10"]])),
            Some(Input::ShadowDefault(Some(InputValue::Primitive(Primitive {
                kind: PrimitiveKind::Number,
                value: "10".to_string(),
                id: None,
            }))))
        );
        assert_eq!(
            Input::from_value(&json!([2, "abc"])),
            Some(Input::NoShadow(Some(InputValue::Block("abc".to_string()))))
        );
        let obscured = Input::from_value(&json!([3, "rep", [10, "hi"]])).unwrap();
        assert_eq!(obscured.block_id(), Some("rep"));
        assert!(matches!(
            obscured.obscured_shadow(),
            Some(InputValue::Primitive(Primitive { kind: PrimitiveKind::Text, .. }))
        ));
        assert_eq!(Input::from_value(&json!([1, null])), Some(Input::ShadowDefault(None)));
        assert_eq!(Input::from_value(&json!([9, "x"])), None);
        assert_eq!(Input::from_value(&json!("nope")), None);
    }

    #[test]
    fn numeric_primitive_values_render_as_text() {
        let p = Primitive::from_array(&[json!(4), json!(1.5)]).unwrap();
        assert_eq!(p.value, "1.5");
        let var = Primitive::from_array(&[json!(12), json!("score"), json!("varid"), json!(10), json!(20)])
            .unwrap();
        assert_eq!(var.kind, PrimitiveKind::Variable);
        assert_eq!(var.id.as_deref(), Some("varid"));
    }

    #[test]
    fn malformed_entries_are_dropped_not_fatal() {
        let block = Block::from_value(json!({
            "opcode": "motion_movesteps",
            "next": "",
            "inputs": {"STEPS": [1, [4, "10"]], "BROKEN": 7},
            "fields": {"GOOD": ["x", null], "BAD": 3},
            "mutation": "not an object"
        }))
        .unwrap();
        assert!(block.next.is_none());
        assert!(block.inputs.contains_key("STEPS"));
        assert!(!block.inputs.contains_key("BROKEN"));
        assert_eq!(block.fields.get("GOOD"), Some(&Field::Simple("x".to_string())));
        assert!(!block.fields.contains_key("BAD"));
        assert!(block.mutation.is_none());
    }

    #[test]
    fn loose_reporters_become_top_level_blocks() {
        let target = Target::from_json(
            r#"{
                "name": "Sprite1",
                "blocks": {
                    "v": [12, "score", "vid", 40, 50],
                    "l": [13, "items", "lid", 40, 90],
                    "bad": [10, "text"]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(target.blocks.len(), 2);
        let v = target.blocks.get("v").unwrap();
        assert_eq!(v.opcode, "data_variable");
        assert!(v.top_level);
        assert_eq!(
            v.fields.get("VARIABLE"),
            Some(&Field::WithId("score".to_string(), "vid".to_string()))
        );
        assert_eq!(target.blocks.get("l").unwrap().opcode, "data_listcontents");
    }

    #[test]
    fn field_ids_are_counted_and_named() {
        let project = Project::from_json(
            r#"{"targets": [
                {"name": "Stage", "isStage": true, "variables": {"vid": ["score", 0]},
                 "lists": {"lid": ["items", []]}, "blocks": {}},
                {"name": "Cat", "blocks": {
                    "a": {"opcode": "data_changevariableby", "fields": {"VARIABLE": ["score", "vid"]}},
                    "b": {"opcode": "data_setvariableto", "fields": {"VARIABLE": ["score", "vid"]}},
                    "c": {"opcode": "data_deletealloflist", "fields": {"LIST": ["items", "lid"]}}
                }}
            ]}"#,
        )
        .unwrap();
        let refs = project.field_references();
        assert_eq!(refs.get("vid"), Some(&2));
        assert_eq!(refs.get("lid"), Some(&1));
        assert_eq!(project.data_name("lid"), Some("items"));
        assert_eq!(project.data_name("nope"), None);
    }

    #[test]
    fn mutation_lists_decode_lazily() {
        let mutation = Mutation {
            proccode: Some("jump %s".to_string()),
            argumentids: Some(r#"["a","b"]"#.to_string()),
            argumentnames: Some("not json".to_string()),
        };
        assert_eq!(mutation.argument_ids(), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(mutation.argument_names(), None);
        assert_eq!(Mutation::default().argument_ids(), Some(Vec::new()));
    }

    #[test]
    fn stats_count_project_features() {
        let project = Project::from_json(
            r#"{
                "targets": [
                    {
                        "name": "Stage", "isStage": true,
                        "variables": {"v1": ["score", 0], "v2": ["☁ best", 10, true]},
                        "broadcasts": {"b1": "go"},
                        "blocks": {},
                        "costumes": [{"name": "bg", "assetId": "abc", "dataFormat": "svg"}],
                        "sounds": []
                    },
                    {
                        "name": "Cat", "isStage": false,
                        "variables": {"v3": ["speed", 2]},
                        "broadcasts": {"b1": "go"},
                        "blocks": {
                            "d": {"opcode": "procedures_definition", "topLevel": true},
                            "c": {"opcode": "control_create_clone_of", "topLevel": true}
                        },
                        "costumes": [{"name": "bg", "assetId": "abc", "dataFormat": "svg"}],
                        "sounds": [{"name": "meow", "assetId": "def", "dataFormat": "wav", "md5ext": "def.wav"}]
                    }
                ],
                "extensions": ["pen"],
                "meta": {"semver": "3.0.0", "vm": "1.0", "agent": "test"}
            }"#,
        )
        .unwrap();
        let stats = project.stats();
        assert_eq!(stats.sprites, 1);
        assert_eq!(stats.blocks, 2);
        assert_eq!(stats.custom_blocks, 1);
        assert_eq!(stats.clone_blocks, 1);
        assert_eq!(stats.broadcasts, 1);
        assert_eq!(stats.cloud_variables, 1);
        assert_eq!(stats.global_variables, 1);
        assert_eq!(stats.sprite_variables, 1);
        assert_eq!(stats.extensions, 1);

        let assets: Vec<String> = project.referenced_assets().into_iter().map(|a| a.md5ext).collect();
        assert_eq!(assets, vec!["abc.svg".to_string(), "def.wav".to_string()]);
        assert_eq!(project.stage().map(|t| t.name.as_str()), Some("Stage"));
        assert!(project.sprite("Cat").is_some());
    }
}
