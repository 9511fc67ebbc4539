use crate::error::Invalid;

/// A macro body with its parameters replaced by positional slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Macro {
    params: Vec<String>,
    lines: Vec<String>,
    label: Option<String>,
}

fn slot(idx: usize) -> String {
    format!("\u{1}{}\u{1}", idx)
}

impl Macro {
    pub fn new(params: Vec<String>) -> Self {
        Macro {
            params,
            lines: vec![],
            label: None,
        }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Label for the next line produced, then forgotten.
    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub fn add_line(&mut self, raw: &str) {
        // longest first so `&A` does not eat the head of `&AB`
        let mut order: Vec<usize> = (0..self.params.len()).collect();
        order.sort_by_key(|&idx| std::cmp::Reverse(self.params[idx].len()));

        let mut line = raw.to_string();
        for idx in order {
            let param = &self.params[idx];
            if !param.is_empty() {
                line = line.replace(param.as_str(), &slot(idx));
            }
        }
        if let Some(label) = self.label.take() {
            line = format!("{}   {}", label, line);
        }
        self.lines.push(line);
    }

    /// Body with every slot filled from `args`.
    pub fn lines(&mut self, args: &[String]) -> Result<Vec<String>, Invalid> {
        if args.len() != self.params.len() {
            return Err(Invalid::ArityMismatch {
                expected: self.params.len(),
                found: args.len(),
            });
        }
        let mut expanded: Vec<String> = self
            .lines
            .iter()
            .map(|line| {
                args.iter()
                    .enumerate()
                    .fold(line.clone(), |acc, (idx, arg)| acc.replace(&slot(idx), arg))
            })
            .collect();
        if let Some(label) = self.label.take() {
            if let Some(first) = expanded.first_mut() {
                *first = format!("{}   {}", label, first);
            }
        }
        Ok(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rdbuff() -> Macro {
        let mut m = Macro::new(vec!["&INDEV".into(), "&BUFADR".into()]);
        m.add_line("        CLEAR   X");
        m.add_line("        TD      =X'&INDEV'");
        m.add_line("        STCH    &BUFADR,X");
        m
    }

    #[test]
    fn expand() {
        let mut m = rdbuff();
        let lines = m.lines(&["F1".into(), "BUFFER".into()]).unwrap();
        assert_eq!(
            lines,
            vec![
                "        CLEAR   X",
                "        TD      =X'F1'",
                "        STCH    BUFFER,X",
            ]
        );
    }

    #[test]
    fn label_only_on_first_line() {
        let mut m = rdbuff();
        m.set_label(Some("LOOP".into()));
        let lines = m.lines(&["F1".into(), "BUF".into()]).unwrap();
        assert_eq!(lines[0], "LOOP           CLEAR   X");
        assert_eq!(lines[1], "        TD      =X'F1'");

        // cleared after use
        let again = m.lines(&["F1".into(), "BUF".into()]).unwrap();
        assert_eq!(again[0], "        CLEAR   X");
    }

    #[test]
    fn label_at_definition() {
        let mut m = Macro::new(vec!["&A".into()]);
        m.set_label(Some("TOP".into()));
        m.add_line("LDA &A");
        m.add_line("STA &A");
        assert_eq!(m.lines(&["X1".into()]).unwrap(), vec!["TOP   LDA X1", "STA X1"]);
    }

    #[test]
    fn overlapping_params() {
        let mut m = Macro::new(vec!["&A".into(), "&AB".into()]);
        m.add_line("ADD &AB,&A");
        assert_eq!(m.lines(&["1".into(), "2".into()]).unwrap(), vec!["ADD 2,1"]);
    }

    #[test]
    fn arity() {
        let mut m = rdbuff();
        assert_eq!(
            m.lines(&["F1".into()]),
            Err(Invalid::ArityMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn idempotent() {
        let mut m = rdbuff();
        let args = vec!["05".to_string(), "DATA".to_string()];
        assert_eq!(m.lines(&args).unwrap(), m.lines(&args).unwrap());
    }
}
