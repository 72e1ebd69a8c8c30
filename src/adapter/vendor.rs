//! 数据源菜单格式解析
//! 在各家菜单接口的响应中定位商品列表，并将每个商品展开为原始字段包

use std::fmt;
use std::str::FromStr;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DispensaryError;
use crate::model::{RawBag, RawProductRecord, RawValue};

/// 数据源菜单格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorSchema {
    /// `data` 列表，价格与规格在 `variants[0]`
    Trulieve,
    /// `data` 列表，品类/重量在 `sku.product`，合物在 `potency`
    Cresco,
    /// GraphQL `data.filteredProducts.products`
    Dutchie,
    /// Algolia `hits`，合物在 `lab_results` 或 `store_notes`
    IHeartJane,
    /// Sweed POS（Zen Leaf）`list`，每个规格一条记录，化验数据为 `{thc|cbd|terpenes: {values: [{code, min}]}}`
    Sweed,
    /// 商品对象原样作为字段包
    Generic,
}

impl VendorSchema {
    pub const ALL: [VendorSchema; 6] = [
        VendorSchema::Trulieve,
        VendorSchema::Cresco,
        VendorSchema::Dutchie,
        VendorSchema::IHeartJane,
        VendorSchema::Sweed,
        VendorSchema::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VendorSchema::Trulieve => "trulieve",
            VendorSchema::Cresco => "cresco",
            VendorSchema::Dutchie => "dutchie",
            VendorSchema::IHeartJane => "iheartjane",
            VendorSchema::Sweed => "sweed",
            VendorSchema::Generic => "generic",
        }
    }

    /// 定位响应中的商品列表（找不到时为空）
    pub fn products<'a>(&self, payload: &'a Value) -> &'a [Value] {
        let list = match self {
            VendorSchema::Trulieve | VendorSchema::Cresco => payload.get("data"),
            VendorSchema::Dutchie => json_path(payload, &["data", "filteredProducts", "products"]),
            VendorSchema::IHeartJane => payload.get("hits"),
            VendorSchema::Sweed => payload.get("list"),
            VendorSchema::Generic => {
                if payload.is_array() {
                    Some(payload)
                } else {
                    ["products", "data", "items", "hits"].iter().find_map(|k| payload.get(*k))
                }
            }
        };
        list.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 分页响应是否还有下一页
    pub fn has_next_page(&self, payload: &Value) -> bool {
        match self {
            VendorSchema::Trulieve => payload
                .get("next_page_url")
                .is_some_and(|v| !v.is_null()),
            _ => !self.products(payload).is_empty(),
        }
    }

    /// 解析整个响应为原始记录
    pub fn extract(&self, source: &str, store: &str, payload: &Value) -> Vec<RawProductRecord> {
        self.products(payload)
            .iter()
            .filter(|p| p.is_object())
            .flat_map(|p| self.flatten(p))
            .map(|fields| RawProductRecord::new(source, store, fields))
            .collect()
    }

    /// 将单个商品展开为字段包；按规格拆分的商品会得到多个字段包
    pub fn flatten(&self, product: &Value) -> Vec<RawBag> {
        match self {
            VendorSchema::Trulieve => vec![flatten_trulieve(product)],
            VendorSchema::Cresco => vec![flatten_cresco(product)],
            VendorSchema::Dutchie => vec![flatten_dutchie(product)],
            VendorSchema::IHeartJane => flatten_iheartjane(product),
            VendorSchema::Sweed => flatten_sweed(product),
            VendorSchema::Generic => match RawValue::from_json(product) {
                RawValue::Nested(bag) => vec![bag],
                _ => Vec::new(),
            },
        }
    }
}

impl fmt::Display for VendorSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VendorSchema {
    type Err = DispensaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trulieve" => Ok(VendorSchema::Trulieve),
            "cresco" | "sunnyside" => Ok(VendorSchema::Cresco),
            "dutchie" => Ok(VendorSchema::Dutchie),
            "iheartjane" | "jane" => Ok(VendorSchema::IHeartJane),
            "sweed" | "zenleaf" | "zen_leaf" => Ok(VendorSchema::Sweed),
            "generic" => Ok(VendorSchema::Generic),
            other => Err(DispensaryError::InvalidInput(format!("未知菜单格式：{}", other))),
        }
    }
}

fn json_path<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(value, |v, k| v.get(*k))
}

/// 拷贝存在且非 null 的字段
fn copy_field(bag: &mut RawBag, key: &str, value: Option<&Value>) {
    if let Some(v) = value.filter(|v| !v.is_null()) {
        bag.push(key, RawValue::from_json(v));
    }
}

/// 把 [{<外层>.name, value}] 形式的读数列表转成以名称为键的字段包
fn named_readings(list: Option<&Value>, name_paths: &[&[&str]]) -> Option<RawBag> {
    let items = list?.as_array()?;
    let mut bag = RawBag::new();
    for item in items {
        let name = name_paths
            .iter()
            .find_map(|path| json_path(item, path).and_then(Value::as_str));
        if let Some(name) = name {
            let value = item.get("value").map(RawValue::from_json).unwrap_or(RawValue::Null);
            bag.push(name, value);
        }
    }
    Some(bag)
}

fn flatten_trulieve(product: &Value) -> RawBag {
    let mut bag = RawBag::new();
    for key in ["name", "brand", "category", "subcategory", "thc_content", "cbd_content"] {
        copy_field(&mut bag, key, product.get(key));
    }

    let variant = json_path(product, &["variants"]).and_then(|v| v.get(0));
    if let Some(variant) = variant {
        copy_field(&mut bag, "option", variant.get("option"));
        copy_field(&mut bag, "sale_unit_price", variant.get("sale_unit_price"));
        copy_field(&mut bag, "unit_price", variant.get("unit_price"));
    }
    copy_field(&mut bag, "unit_price", product.get("unit_price"));

    if let Some(terps) = named_readings(product.get("terpenes"), &[&["name"]]) {
        bag.push("terpenes", terps);
    }
    bag
}

fn flatten_cresco(product: &Value) -> RawBag {
    let mut bag = RawBag::new();
    copy_field(&mut bag, "name", product.get("name"));
    copy_field(&mut bag, "brand", product.get("brand"));

    let sku_product = json_path(product, &["sku", "product"]);
    if let Some(sp) = sku_product {
        copy_field(&mut bag, "category", sp.get("category"));
        copy_field(&mut bag, "sub_category", sp.get("sub_category"));
        copy_field(&mut bag, "weight", sp.get("weight"));
        copy_field(&mut bag, "weight_in_g", sp.get("weight_in_g"));
    }

    copy_field(&mut bag, "discounted_price", product.get("discounted_price"));
    copy_field(&mut bag, "price", product.get("price"));
    copy_field(&mut bag, "potency", product.get("potency"));
    bag
}

fn flatten_dutchie(product: &Value) -> RawBag {
    let mut bag = RawBag::new();
    copy_field(&mut bag, "name", product.get("Name").or_else(|| product.get("name")));
    copy_field(&mut bag, "brandName", product.get("brandName"));
    copy_field(&mut bag, "type", product.get("type"));
    copy_field(&mut bag, "subcategory", product.get("subcategory"));

    // 医疗价优先，没有时退回娱乐价；各自取所有规格中的最低价
    let special = min_number(product.get("medicalSpecialPrices"))
        .or_else(|| min_number(product.get("recSpecialPrices")));
    if let Some(p) = special {
        bag.push("special_price", p);
    }
    let regular = min_number(product.get("medicalPrices"))
        .or_else(|| min_number(product.get("recPrices")));
    if let Some(p) = regular {
        bag.push("price", p);
    }
    copy_field(&mut bag, "option", product.get("Options").and_then(|o| o.get(0)));

    if let Some(terps) = named_readings(product.get("terpenes"), &[&["libraryTerpene", "name"], &["name"]]) {
        bag.push("terpenes", terps);
    }
    match named_readings(product.get("cannabinoidsV2"), &[&["cannabinoid", "name"], &["name"]]) {
        Some(cannabinoids) => bag.push("cannabinoidsV2", cannabinoids),
        None => copy_field(
            &mut bag,
            "thc_content",
            json_path(product, &["THCContent", "range"]).and_then(|r| r.get(0)),
        ),
    }
    bag
}

fn flatten_iheartjane(product: &Value) -> Vec<RawBag> {
    let mut common = RawBag::new();
    copy_field(&mut common, "name", product.get("name"));
    copy_field(&mut common, "brand", product.get("brand"));
    copy_field(&mut common, "kind", product.get("kind"));
    copy_field(&mut common, "kind_subtype", product.get("kind_subtype"));

    // 化验结果按组给出，组内为 {compound_name, value}
    let mut lab = RawBag::new();
    if let Some(groups) = product.get("lab_results").and_then(Value::as_array) {
        for group in groups {
            if let Some(readings) = named_readings(group.get("lab_results"), &[&["compound_name"]]) {
                for (name, value) in readings.iter() {
                    lab.push(name, value.clone());
                }
            }
        }
    }
    if !lab.is_empty() {
        common.push("lab_results", lab);
    } else if let Some(notes) = product.get("store_notes").and_then(Value::as_str) {
        let parsed = parse_store_notes(notes);
        if !parsed.is_empty() {
            common.push("store_notes_compounds", parsed);
        }
    }

    let net_weight = product
        .get("net_weight_grams")
        .and_then(Value::as_f64)
        .filter(|w| *w > 0.0);
    let available: Vec<&str> = product
        .get("available_weights")
        .and_then(Value::as_array)
        .map(|ws| ws.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    // 没有净重但有多个规格时，每个规格一条记录
    if net_weight.is_none() && !available.is_empty() {
        return available
            .iter()
            .filter_map(|weight| {
                let slug = weight.replace(' ', "_");
                let special_key = format!("special_price_{}", slug);
                let price_key = format!("price_{}", slug);
                let discount = json_path(product, &[special_key.as_str(), "discount_price"]);
                let price = product.get(price_key.as_str());
                if discount.is_none() && price.is_none_or(Value::is_null) {
                    return None;
                }
                let mut bag = common.clone();
                copy_field(&mut bag, "discount_price", discount);
                copy_field(&mut bag, "price_each", price);
                bag.push("weight", *weight);
                Some(bag)
            })
            .collect();
    }

    let mut bag = common;
    copy_field(&mut bag, "discount_price", json_path(product, &["special_price_each", "discount_price"]));
    copy_field(&mut bag, "price_each", product.get("price_each"));
    if let Some(w) = net_weight {
        bag.push("net_weight_grams", w);
    }
    vec![bag]
}

fn flatten_sweed(product: &Value) -> Vec<RawBag> {
    let mut common = RawBag::new();
    copy_field(&mut common, "name", product.get("name"));
    copy_field(&mut common, "brand", named_or_plain(product.get("brand")));
    copy_field(&mut common, "category", named_or_plain(product.get("category")));
    copy_field(&mut common, "subcategory", named_or_plain(product.get("subcategory")));

    let Some(variants) = product.get("variants").and_then(Value::as_array) else {
        return Vec::new();
    };
    variants
        .iter()
        .filter(|v| v.is_object())
        .map(|variant| {
            let mut bag = common.clone();
            copy_field(&mut bag, "promo_price", variant.get("promoPrice"));
            copy_field(&mut bag, "price", variant.get("price"));
            copy_field(&mut bag, "option", variant.get("name"));
            if let Some(grams) = sweed_unit_grams(variant.get("unitSize")) {
                bag.push("weight_grams", grams);
            }
            // 化验数据可能挂在规格上，也可能挂在商品上
            let lab = variant.get("labData").or_else(|| product.get("labData"));
            if let Some(readings) = lab.map(sweed_lab_readings).filter(|r| !r.is_empty()) {
                bag.push("lab_data", readings);
            }
            bag
        })
        .collect()
}

/// `{name: ...}` 对象取其名称，字符串原样返回
fn named_or_plain(value: Option<&Value>) -> Option<&Value> {
    let value = value?;
    if value.is_object() { value.get("name") } else { Some(value) }
}

/// `unitSize {value, unitAbbr}` 换算为克，只识别 g 与 mg
fn sweed_unit_grams(unit_size: Option<&Value>) -> Option<f64> {
    let unit_size = unit_size?;
    let value = unit_size.get("value").and_then(Value::as_f64)?;
    match unit_size.get("unitAbbr").and_then(Value::as_str)?.trim().to_ascii_uppercase().as_str() {
        "G" => Some(value),
        "MG" => Some(value / 1000.0),
        _ => None,
    }
}

/// 取 thc/cbd/terpenes 三组中每项的下限 `min` 作为读数
fn sweed_lab_readings(lab: &Value) -> RawBag {
    let mut bag = RawBag::new();
    for group in ["thc", "cbd", "terpenes"] {
        let Some(items) = json_path(lab, &[group, "values"]).and_then(Value::as_array) else {
            continue;
        };
        for item in items {
            if let Some(code) = item.get("code").and_then(Value::as_str) {
                let value = item.get("min").map(RawValue::from_json).unwrap_or(RawValue::Null);
                bag.push(code, value);
            }
        }
    }
    bag
}

/// 解析门店备注中的 "Limonene: 1.23%" 文本
fn parse_store_notes(text: &str) -> RawBag {
    static NOTE_REGEX: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"([a-zA-Z\s_-]+)[\s:]*([\d.]+)%"#).unwrap()
    });

    let mut bag = RawBag::new();
    for captures in NOTE_REGEX.captures_iter(text) {
        let (Some(name), Some(value)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let name = name.as_str().trim();
        if !name.is_empty() {
            bag.push(name, value.as_str());
        }
    }
    bag
}

fn min_number(list: Option<&Value>) -> Option<f64> {
    list?
        .as_array()?
        .iter()
        .filter_map(Value::as_f64)
        .filter(|v| v.is_finite())
        .reduce(f64::min)
}
