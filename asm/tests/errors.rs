use sicasm::{Error, Invalid, Session};

fn reject(source: &str, max_depth: Option<usize>) -> (usize, Invalid) {
    let mut session = Session::new();
    if let Some(depth) = max_depth {
        session.options.max_macro_depth = depth;
    }
    match session.assemble(source) {
        Err(Error::Invalid { line, raw, kind }) => {
            println!("{line}: {raw}");
            println!("  {kind}");
            (line, kind)
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(object) => panic!("assembled:\n{}", object),
    }
}

macro_rules! case {
    ($name:ident, $source:expr, $line:expr, $expect:expr) => {
        #[test]
        fn $name() {
            assert_eq!(reject($source, None), ($line, $expect));
        }
    };
}

case!(
    duplicate_label,
    "ALPHA   LDA     #1\nALPHA   LDA     #2\n",
    2,
    Invalid::DuplicateLabel("ALPHA".to_string())
);

case!(
    unknown_mnemonic,
    "        LDA     #1\n        FOO     BAR\n",
    2,
    Invalid::UnknownMnemonic("FOO".to_string())
);

case!(
    invalid_byte,
    "        BYTE    Q'1'\n",
    1,
    Invalid::InvalidByteArgument("Q'1'".to_string())
);

case!(
    too_many_fields,
    "A B C D\n",
    1,
    Invalid::TokenCount("A B C D".to_string())
);

case!(
    missing_base,
    "        LDA     FAR\n        RESB    4096\nFAR     WORD    1\n",
    1,
    Invalid::MissingBaseRegister
);

case!(
    nobase_clears_base,
    "\
        BASE    FAR
        NOBASE
        LDA     FAR
        RESB    4096
FAR     WORD    1
",
    3,
    Invalid::MissingBaseRegister
);

case!(
    reserve_too_large,
    "        RESW    1431655766\n",
    1,
    Invalid::MalformedNumber("1431655766".to_string())
);

case!(
    undefined_symbol,
    "        LDA     NOWHERE\n",
    1,
    Invalid::UndefinedSymbol("NOWHERE".to_string())
);

case!(
    bad_register,
    "        CLEAR   Q\n",
    1,
    Invalid::InvalidRegister("Q".to_string())
);

case!(
    arity_mismatch,
    "\
ONE     MACRO   &A
        LDA     &A
        MEND
        ONE     1,2
",
    4,
    Invalid::ArityMismatch {
        expected: 1,
        found: 2
    }
);

case!(
    unterminated_macro,
    "        LDA     #1\nM1      MACRO\n        LDA     #1\n",
    2,
    Invalid::UnterminatedMacro("M1".to_string())
);

case!(stray_mend, "        MEND\n", 1, Invalid::StrayMend);

case!(
    sic_has_no_format4,
    "!USE SIC\n        +LDA    FIVE\n",
    2,
    Invalid::UnknownMnemonic("+LDA".to_string())
);

case!(
    sic_has_no_base,
    "!USE SIC\n        BASE    FIVE\n",
    2,
    Invalid::UnknownMnemonic("BASE".to_string())
);

case!(
    sic_has_no_registers,
    "!USE SIC\n        CLEAR   X\n",
    2,
    Invalid::UnknownMnemonic("CLEAR".to_string())
);

#[test]
fn recursive_macro() {
    let source = "\
REC     MACRO
        REC
        MEND
        LDA     #1
        REC
";
    assert_eq!(reject(source, Some(5)), (5, Invalid::MacroDepth(5)));
}

#[test]
fn nested_definition() {
    // the inner MEND does not close the outer definition
    let source = "\
OUTER   MACRO
INNER   MACRO
        LDA     #1
        MEND
        MEND
        OUTER
        INNER
";
    let object = Session::new().assemble(source).unwrap();
    assert!(object.contains("T00000003010001"));
}
