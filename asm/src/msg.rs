use color_print::cprintln;

#[derive(Debug)]
pub enum Msg {
    Error(String),
    Warn(String),
    Note(String),
}

impl Msg {
    pub fn print(&self) {
        match self {
            Msg::Error(msg) => cprintln!("<red,bold>error</>: {}", msg),
            Msg::Warn(msg) => cprintln!("<yellow,bold>warn</>: {}", msg),
            Msg::Note(msg) => cprintln!("<green,bold>note</>: {}", msg),
        }
    }

    /// Message followed by the offending source line.
    pub fn diag(&self, info: (&str, usize, &str)) {
        let (file, line, raw) = info;
        self.print();
        cprintln!("     <blue>--></> <underline>{}:{}</>", file, line);
        cprintln!("      <blue>|</>");
        cprintln!(" <blue>{:>4} |</> {}", line, raw);
        cprintln!("      <blue>|</>");
    }
}

/// Report table entries that were skipped while loading a resource file.
pub fn table_warnings(path: &str, warnings: &[arch::Error]) {
    for warning in warnings {
        Msg::Warn(format!("{}: {}", path, warning)).print();
    }
    if !warnings.is_empty() {
        Msg::Note(format!("{} entr(ies) ignored", warnings.len())).print();
    }
}
