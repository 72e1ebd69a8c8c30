//! 内置标准化映射表
//! 品牌归并、品类允许列表、子品类、合物别名、描述性垃圾键、聚合规则、字段角色别名

use std::collections::BTreeMap;

use super::model::{
    AggregationRule, CompoundClass, CompoundEntry, FieldAliases, MapDefinition, SubcategoryDefinition,
};
use crate::model::MedicationCategory;

/// 品牌别名 -> 归并后的母品牌
const BRANDS: &[(&str, &str)] = &[
    // GTI
    ("Good Green", "GTI"), ("&Shine", "GTI"), ("Rythm", "GTI"), ("Rhythm", "GTI"),
    // Jushi
    ("The Bank", "Jushi"), ("The Lab", "Jushi"), ("Seche", "Jushi"), ("Lab", "Jushi"),
    // Trulieve
    ("TruFlower", "Trulieve"), ("Cultivar Collection", "Trulieve"), ("Modern Flower", "Trulieve"),
    ("Avenue", "Trulieve"), ("Muse", "Trulieve"), ("Moxie", "Trulieve"), ("Moxie - PA", "Trulieve"),
    ("Franklin Labs", "Trulieve"), ("Khalifa Kush", "Trulieve"), ("Roll One (Trulieve)", "Trulieve"),
    // Ayr
    ("Lost In Translation", "Ayr"), ("Revel", "Ayr"), ("Origyn", "Ayr"),
    ("Seven Hills", "Ayr"), ("Kynd", "Ayr"),
    // Cresco
    ("Supply/Cresco", "Cresco"), ("FloraCal", "Cresco"), ("FloraCal Farms", "Cresco"),
    ("Cresco Labs", "Cresco"), ("Sunnyside", "Cresco"),
    // Curaleaf
    ("Grass Roots", "Curaleaf"), ("Blades", "Curaleaf"), ("Select", "Curaleaf"), ("Select Briq", "Curaleaf"),
    // Verano
    ("Essence", "Verano"), ("Savvy", "Verano"), ("Muv", "Verano"),
    // Vytal（Solventless 与 mood 单独保留）
    ("Vytal Options", "Vytal"), ("Solventless by Vytal", "Vytal Solventless"), ("mood by Vytal", "mood"),
    // R.O.
    ("R.O. Ground", "R.O."), ("R.O. Shake", "R.O."),
    // Strane
    ("Strane Stash", "Strane"), ("Strane Reserve", "Strane"),
    // 其他单条归并
    ("The Woods", "Terrapin"), ("The Woods Reserve", "Terrapin"), ("Woods Reserve", "Terrapin"),
    ("Cookies", "Kind Tree"), ("Gage", "Kind Tree"),
    ("Old Pal", "Standard Farms"), ("Highsman", "Standard Farms"),
    ("Tyson 2.0", "Columbia Care"), ("Triple Seven", "Columbia Care"), ("Classix", "Columbia Care"),
    ("FarmaceuticalRx", "FRX"),
    ("Maitri Medicinals", "Maitri"), ("Maitri Genetics", "Maitri"),
    ("Penn Health Group", "PHG"), ("Penn Health", "PHG"),
    ("The John Daly Collection by PHG", "PHG"), ("John Daly", "PHG"),
    ("Prime Wellness", "Prime"),
    ("SupplyTM", "Supply"),
    ("Calypso Bountiful", "Calypso"),
    ("Garcia Hand Picked", "Garcia"),
    ("Redemption Shake", "Redemption"),
    ("Sunshine Cannabis", "Sunshine"),
    ("Ozone Reserve", "Ozone"),
    ("Jim's Stash of Good Ugly Flower", "Belushi's Farm"),
    ("Botanist", "The Botanist"),
    ("Flower by Edie Parker", "Edie Parker"),
    ("Black Buddha Cannabis", "Black Buddha"),
    ("Natural Selections", "Natural Selections"),
    ("Organic Remedies", "Organic Remedies"),
];

/// 原始品类 -> 药用品类；未列出的品类（配件、服饰等）一律丢弃
const CATEGORIES: &[(&str, MedicationCategory)] = &[
    ("flower", MedicationCategory::Flower),
    ("buds", MedicationCategory::Flower),
    ("bud", MedicationCategory::Flower),
    ("pre-roll", MedicationCategory::PreRolls),
    ("pre-rolls", MedicationCategory::PreRolls),
    ("preroll", MedicationCategory::PreRolls),
    ("prerolls", MedicationCategory::PreRolls),
    ("joints", MedicationCategory::PreRolls),
    ("vape", MedicationCategory::Vaporizers),
    ("vapes", MedicationCategory::Vaporizers),
    ("vaporizer", MedicationCategory::Vaporizers),
    ("vaporizers", MedicationCategory::Vaporizers),
    ("concentrate", MedicationCategory::Concentrates),
    ("concentrates", MedicationCategory::Concentrates),
    ("extract", MedicationCategory::Concentrates),
    ("extracts", MedicationCategory::Concentrates),
    ("edible", MedicationCategory::Edibles),
    ("edibles", MedicationCategory::Edibles),
    ("tincture", MedicationCategory::Tinctures),
    ("tinctures", MedicationCategory::Tinctures),
    ("topical", MedicationCategory::Topicals),
    ("topicals", MedicationCategory::Topicals),
];

const GLOBAL_SUBCATEGORIES: &[(&str, &str)] = &[
    ("cartridge", "Cartridges"),
    ("cartridges", "Cartridges"),
    ("disposable", "Disposables"),
    ("disposables", "Disposables"),
];

/// 同一原始子品类在不同品类下含义不同，如 "live resin"
const SCOPED_SUBCATEGORIES: &[(MedicationCategory, &[(&str, &str)])] = &[
    (MedicationCategory::Flower, &[
        ("whole flower", "Whole Flower"), ("ground", "Ground"), ("ground flower", "Ground"),
        ("shake", "Shake"), ("smalls", "Smalls"), ("popcorn", "Smalls"),
    ]),
    (MedicationCategory::PreRolls, &[
        ("single", "Singles"), ("singles", "Singles"),
        ("multi-pack", "Multi-Packs"), ("multipack", "Multi-Packs"), ("packs", "Multi-Packs"),
        ("infused", "Infused"), ("infused pre-roll", "Infused"),
    ]),
    (MedicationCategory::Vaporizers, &[
        ("live resin", "Live Resin Cartridges"), ("liquid live resin", "Live Resin Cartridges"),
        ("pod", "Pods"), ("pods", "Pods"),
        ("all-in-one", "Disposables"),
    ]),
    (MedicationCategory::Concentrates, &[
        ("live resin", "Live Resin"),
        ("badder", "Badder"), ("budder", "Badder"),
        ("shatter", "Shatter"), ("wax", "Wax"), ("sugar", "Sugar"), ("sauce", "Sauce"),
        ("crumble", "Crumble"), ("diamonds", "Diamonds"),
        ("rosin", "Rosin"), ("live rosin", "Live Rosin"),
        ("rso", "RSO"), ("kief", "Kief"),
    ]),
    (MedicationCategory::Edibles, &[
        ("gummy", "Gummies"), ("gummies", "Gummies"),
        ("chocolate", "Chocolates"), ("chocolates", "Chocolates"),
        ("capsule", "Capsules"), ("capsules", "Capsules"),
    ]),
];

const CANNABINOIDS: &[(&str, &[&str])] = &[
    ("THC", &["thc", "thc_content", "delta-9 thc", "d9-thc", "Δ9-THC"]),
    ("THCa", &["thca", "thc-a", "thca_content"]),
    ("CBD", &["cbd", "cbd_content"]),
    ("CBDa", &["cbda", "cbd-a"]),
    ("CBG", &["cbg"]),
    ("CBGa", &["cbga", "cbg-a"]),
    ("CBN", &["cbn"]),
    ("THCv", &["thcv", "thc-v"]),
    ("Delta-8 THC", &["delta-8", "delta8", "d8-thc", "Δ8-THC"]),
];

const TERPENES: &[(&str, &[&str])] = &[
    ("alpha-Pinene", &["a-pinene", "alpha_pinene", "AlphaPinene"]),
    ("beta-Pinene", &["b-pinene", "beta_pinene", "BetaPinene"]),
    ("Pinene", &["total pinene"]),
    ("beta-Myrcene", &["myrcene", "b-myrcene", "beta_myrcene", "BetaMyrcene"]),
    ("Limonene", &["d-limonene"]),
    ("beta-Caryophyllene", &["caryophyllene", "b-caryophyllene", "beta_caryophyllene", "BetaCaryophyllene"]),
    ("Linalool", &[]),
    ("Terpinolene", &[]),
    ("Humulene", &["alpha-humulene", "a-humulene"]),
    ("Ocimene", &["beta-ocimene", "b-ocimene"]),
    ("Guaiol", &[]),
    ("alpha-Bisabolol", &["bisabolol", "a-bisabolol"]),
    ("Camphene", &[]),
    ("Caryophyllene Oxide", &["caryophyllene_oxide", "CaryophylleneOxide"]),
    ("alpha-Terpinene", &["a-terpinene"]),
    ("gamma-Terpinene", &["g-terpinene", "y-terpinene"]),
    ("Carene", &["delta-3-carene", "3-carene"]),
    ("Eucalyptol", &["1,8-cineole", "cineole"]),
    ("Farnesene", &["beta-farnesene", "trans-beta-farnesene"]),
    ("Geraniol", &[]),
    ("p-Cymene", &["para-cymene", "cymene"]),
    ("Terpineol", &["alpha-terpineol", "a-terpineol"]),
    ("trans-Nerolidol", &["nerolidol", "t-nerolidol"]),
];

/// 描述性字段：看起来像合物读数，但不是
const JUNK: &[&str] = &[
    "id", "location_id", "package_number", "batch", "batch_number",
    "total_terps", "total terpenes", "total_terpenes", "terpenes total",
    "thc_total", "cbd_total", "total thc", "total cbd", "tac", "total cannabinoids",
    "thc_min", "thc_max", "cbd_min", "cbd_max",
    "lab tested", "test date", "lab",
];

const FIELD_NAME: &[&str] = &["name", "product_name", "productName"];
const FIELD_BRAND: &[&str] = &["brand", "brandName", "brand_name"];
const FIELD_CATEGORY: &[&str] = &["category", "type", "kind", "product_category"];
const FIELD_SUBCATEGORY: &[&str] = &["subcategory", "sub_category", "kind_subtype", "subtype"];
/// 折扣价在前
const FIELD_PRICE: &[&str] = &[
    "discounted_price", "sale_unit_price", "special_price", "discount_price", "promo_price",
    "price", "unit_price", "price_each",
];
const FIELD_WEIGHT_GRAMS: &[&str] = &["weight_in_g", "net_weight_grams", "weight_grams", "grams"];
const FIELD_WEIGHT_LABEL: &[&str] = &["weight", "option", "weight_str", "size", "options"];
const FIELD_COMPOUND_CONTAINERS: &[&str] = &[
    "potency", "terpenes", "cannabinoids", "cannabinoidsV2", "lab_results",
    "compounds", "store_notes_compounds", "lab_data",
];

/// 构建内置映射表定义
pub fn default_definition() -> MapDefinition {
    MapDefinition {
        brands: to_string_map(BRANDS),
        categories: CATEGORIES.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        subcategories: SubcategoryDefinition {
            global: to_string_map(GLOBAL_SUBCATEGORIES),
            scoped: SCOPED_SUBCATEGORIES
                .iter()
                .map(|(category, entries)| (*category, to_string_map(entries)))
                .collect(),
        },
        compounds: compound_entries(CANNABINOIDS, CompoundClass::Cannabinoid)
            .chain(compound_entries(TERPENES, CompoundClass::Terpene))
            .collect(),
        junk: to_strings(JUNK),
        aggregation_rules: vec![AggregationRule::new("Pinene", &["alpha-Pinene", "beta-Pinene"])],
        fields: FieldAliases {
            name: to_strings(FIELD_NAME),
            brand: to_strings(FIELD_BRAND),
            category: to_strings(FIELD_CATEGORY),
            subcategory: to_strings(FIELD_SUBCATEGORY),
            price: to_strings(FIELD_PRICE),
            weight_grams: to_strings(FIELD_WEIGHT_GRAMS),
            weight_label: to_strings(FIELD_WEIGHT_LABEL),
            compound_containers: to_strings(FIELD_COMPOUND_CONTAINERS),
        },
    }
}

fn to_string_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn compound_entries<'a>(
    table: &'a [(&'a str, &'a [&'a str])],
    class: CompoundClass,
) -> impl Iterator<Item = CompoundEntry> + 'a {
    table.iter().map(move |(canonical, aliases)| CompoundEntry {
        canonical: canonical.to_string(),
        class,
        aliases: to_strings(aliases),
    })
}
