use arch::Hex;
use indexmap::IndexMap;
use serde::Serialize;

use crate::macros::Macro;

/// Symbol names are compared as exactly six upper-case characters.
pub fn normalize(name: &str) -> String {
    let name = name.trim().replace('\t', " ").to_uppercase();
    let name: String = name.chars().take(6).collect();
    format!("{:<6}", name)
}

// ----------------------------------------------------------------------------
// Symbol Table

/// Symbols scoped by control section, plus the macro definitions.
///
/// The table does not reject redefinitions; the builder checks
/// [`SymbolTable::contains_symbol`] first.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    symbols: IndexMap<String, IndexMap<String, Hex>>,
    blocks: IndexMap<String, IndexMap<String, String>>,
    macros: IndexMap<String, Macro>,
}

#[derive(Debug, Serialize)]
struct Entry {
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    block: Option<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `block` is `None` for absolute symbols.
    pub fn add_symbol(&mut self, name: &str, address: Hex, block: Option<&str>, section: &str) {
        self.symbols
            .entry(normalize(section))
            .or_default()
            .insert(normalize(name), address);
        if let Some(block) = block {
            self.add_block(name, block, section);
        }
    }

    pub fn add_block(&mut self, name: &str, block: &str, section: &str) {
        self.blocks
            .entry(normalize(section))
            .or_default()
            .insert(normalize(name), block.to_string());
    }

    pub fn contains_symbol(&self, name: &str, section: &str) -> bool {
        self.get_symbol(name, section).is_some()
    }

    pub fn get_symbol(&self, name: &str, section: &str) -> Option<Hex> {
        self.symbols
            .get(&normalize(section))
            .and_then(|syms| syms.get(&normalize(name)))
            .copied()
    }

    /// Program block owning the symbol, `None` when absolute or unknown.
    pub fn get_block(&self, name: &str, section: &str) -> Option<&str> {
        self.blocks
            .get(&normalize(section))
            .and_then(|blocks| blocks.get(&normalize(name)))
            .map(|s| s.as_str())
    }

    pub fn add_macro(&mut self, name: &str, definition: Macro) {
        self.macros.insert(normalize(name), definition);
    }

    pub fn get_macro(&self, name: &str) -> Option<&Macro> {
        self.macros.get(&normalize(name))
    }

    pub fn macro_names(&self) -> impl Iterator<Item = &str> {
        self.macros.keys().map(|s| s.trim_end())
    }

    /// Symbols of one section in definition order.
    pub fn section(&self, section: &str) -> impl Iterator<Item = (&str, Hex)> {
        self.symbols
            .get(&normalize(section))
            .into_iter()
            .flat_map(|syms| syms.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
        self.blocks.clear();
        self.macros.clear();
    }

    /// section -> symbol -> { address, block }
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        let export: IndexMap<&str, IndexMap<&str, Entry>> = self
            .symbols
            .iter()
            .map(|(section, syms)| {
                let entries = syms
                    .iter()
                    .map(|(name, addr)| {
                        let block = self.get_block(name, section).map(|b| block_name(b));
                        let entry = Entry {
                            address: addr.render(6),
                            block,
                        };
                        (name.trim_end(), entry)
                    })
                    .collect();
                (section.trim_end(), entries)
            })
            .collect();
        serde_yaml::to_string(&export)
    }
}

pub fn block_name(block: &str) -> String {
    if block.is_empty() {
        "(default)".to_string()
    } else {
        block.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_names() {
        assert_eq!(normalize("first"), "FIRST ");
        assert_eq!(normalize("  buffer1\t"), "BUFFER");
        assert_eq!(normalize("a\tb"), "A B   ");
    }

    #[test]
    fn scoped_lookup() {
        let mut table = SymbolTable::new();
        table.add_symbol("loop", Hex::new(0x1003), Some(""), "COPY");
        table.add_symbol("MAXLEN", Hex::new(0x1000), None, "COPY");

        assert!(table.contains_symbol("LOOP", "copy"));
        assert_eq!(table.get_symbol("loopxxxx", "COPY"), None);
        assert_eq!(table.get_symbol("LOOP  ", "COPY"), Some(Hex::new(0x1003)));
        assert_eq!(table.get_block("LOOP", "COPY"), Some(""));
        assert_eq!(table.get_block("MAXLEN", "COPY"), None);

        // other sections do not see it, and are never an error
        assert_eq!(table.get_symbol("LOOP", "RDREC"), None);
        assert!(!table.contains_symbol("LOOP", "NOWHERE"));
    }

    #[test]
    fn clear_resets_everything() {
        let mut table = SymbolTable::new();
        table.add_symbol("A", Hex::new(1), None, "S");
        table.add_macro("M", Macro::new(vec![]));
        assert_eq!(table.macro_names().collect::<Vec<_>>(), vec!["M"]);
        table.clear();
        assert!(!table.contains_symbol("A", "S"));
        assert!(table.get_macro("M").is_none());
        assert_eq!(table.macro_names().count(), 0);
    }

    #[test]
    fn yaml_export() {
        let mut table = SymbolTable::new();
        table.add_symbol("FIRST", Hex::new(0x1000), Some(""), "COPY");
        let yaml = table.to_yaml().unwrap();
        assert!(yaml.contains("COPY:"));
        assert!(yaml.contains("address: '001000'") || yaml.contains("address: \"001000\""));
        assert!(yaml.contains("(default)"));
    }
}
