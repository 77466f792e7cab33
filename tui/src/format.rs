//! Display helpers

use pokedex_core::Pokemon;

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `"mr-mime"` → `"Mr Mime"`
pub fn format_name(name: &str) -> String {
    name.split('-').map(capitalize).collect::<Vec<_>>().join(" ")
}

/// Decimeters to meters with one decimal
pub fn format_height(decimeters: u32) -> String {
    format!("{:.1} m", f64::from(decimeters) / 10.0)
}

/// Hectograms to kilograms with one decimal
pub fn format_weight(hectograms: u32) -> String {
    format!("{:.1} kg", f64::from(hectograms) / 10.0)
}

/// Artwork, then the default sprite, then a placeholder
pub fn sprite_label(pokemon: &Pokemon) -> &str {
    match pokemon.preferred_sprite() {
        "" => "(no image)",
        url => url,
    }
}
