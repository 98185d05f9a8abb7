/// Product-name keywords for the three varieties we track. Matching is
/// case-sensitive substring containment with no normalization.
pub const ORANGE_KEYWORDS: &[&str] = &["แมนดาริน", "เขียวหวาน", "สายน้ำผึ้ง"];

/// Keyword → catalog id, checked in order.
const PRODUCT_ROUTES: &[(&str, &str)] = &[
    ("สายน้ำผึ้ง", "tangerine"),
    ("เขียวหวาน", "green-sweet"),
    ("แมนดาริน", "mandarin"),
];

pub fn contains_orange_keyword(label: &str) -> bool {
    !label.is_empty() && ORANGE_KEYWORDS.iter().any(|kw| label.contains(kw))
}

/// Map a scraped product label onto a catalog id.
pub fn product_id_for(label: &str) -> Option<&'static str> {
    PRODUCT_ROUTES
        .iter()
        .find(|(kw, _)| label.contains(kw))
        .map(|(_, id)| *id)
}
