use sicasm::{assemble, Session};

fn assert(source: &str, expects: &[&str]) {
    let object = match assemble(source) {
        Ok(object) => object,
        Err(err) => panic!("{}", err),
    };
    for line in object.lines() {
        println!("{line}");
    }
    assert_eq!(object.lines().collect::<Vec<_>>(), expects);
}

macro_rules! case {
    ($name:ident, $source:expr, $expects:expr) => {
        #[test]
        fn $name() {
            assert($source, $expects);
        }
    };
}

case!(
    xe_program,
    "\
COPY    START   1000
FIRST   LDA     #3
        STA     ALPHA
        LDCH    =C'Z'
        +JSUB   SUBR
        CLEAR   X
        RSUB
ALPHA   RESW    1
SUBR    LDX     ALPHA
        RSUB
        END     FIRST
",
    &[
        "HCOPY  00100000001C",
        "T001000120100030F200C5320124B101015B4104D0000",
        "T00101507072FFA4D00005A",
        "M00100A05",
        "E001000",
    ]
);

case!(
    sic_program,
    "\
!USE SIC
COPY    START   1000
FIRST   LDA     FIVE
        STA     ALPHA,X
        RSUB
FIVE    WORD    5
ALPHA   RESW    2
        END     FIRST
",
    &[
        "HCOPY  001000000012",
        "T0010000C0010090C900C4C0000000005",
        "E001000",
    ]
);

case!(
    control_sections,
    "\
PROGA   START   0
        EXTDEF  LISTA
        EXTREF  LISTB
        +LDA    LISTB
LISTA   WORD    3
REF     WORD    LISTB
PROGB   CSECT
        EXTDEF  LISTB
        EXTREF  LISTA
LISTB   LDA     LISTA
        END
",
    &[
        "HPROGA 00000000000A",
        "DLISTA 000004",
        "RLISTB ",
        "T0000000A03100000000003000000",
        "M00000105+LISTB ",
        "M00000706+LISTB ",
        "E000000",
        "HPROGB 000000000003",
        "DLISTB 000000",
        "RLISTA ",
        "T00000003030000",
        "M00000103+LISTA ",
        "E",
    ]
);

case!(
    program_blocks,
    "\
PROG    START   0
        LDA     DATA
        USE     CDATA
DATA    WORD    1
        USE
        RSUB
        END
",
    &[
        "HPROG  000000000009",
        "T00000003032003",
        "T00000603000001",
        "T000003034D0000",
        "E000000",
    ]
);

case!(
    macro_with_label,
    "\
COPY    START   0
RDBUFF  MACRO   &DEV,&ADR
        TD      =X'&DEV'
        STCH    &ADR
        MEND
LOOP    RDBUFF  F1,BUF
        J       LOOP
BUF     RESB    1
        END
",
    &[
        "HCOPY  00000000000B",
        "T00000009E320075720033F2FF7",
        "T00000A01F1",
        "E000000",
    ]
);

case!(
    base_register,
    "\
        +LDB    #FAR
        BASE    FAR
        LDA     FAR
        RESB    4096
FAR     WORD    1
",
    &[
        "HOUTPUT00000000100A",
        "T0000000769101007034000",
        "T00100703000001",
        "E000000",
    ]
);

case!(
    equ_expressions,
    "\
        LDA     #MAXLEN
BUFFER  RESB    16
BUFEND  EQU     *
MAXLEN  EQU     BUFEND-BUFFER
        END
",
    &["HOUTPUT000000000013", "T0000000301200D", "E000000"]
);

case!(
    equ_symbol_is_displaced,
    "\
        LDA     MAXLEN
MAXLEN  EQU     10
",
    &["HOUTPUT000000000003", "T0000000303200D", "E000000"]
);

case!(
    ltorg_places_literals,
    "\
P       START   0
        LDA     =C'AB'
        LTORG
        STA     BUF
        LDA     =C'AB'
BUF     RESB    1
        END
",
    &[
        "HP     00000000000C",
        "T0000000B03200041420F2003032FF8",
        "E000000",
    ]
);

case!(
    comments_and_case,
    "\
. whole line comment
        lda     #3   . load
",
    &["HOUTPUT000000000003", "T00000003010003", "E000000"]
);

#[test]
fn header_length_matches_text() {
    let object = assemble(
        "\
P       START   0
        LDA     #1
        LDCH    =X'05'
        CLEAR   A
        LDA     =X'05'
        END
",
    )
    .unwrap();
    let lines: Vec<&str> = object.lines().collect();
    let length = u32::from_str_radix(&lines[0][13..19], 16).unwrap();
    let text: u32 = lines
        .iter()
        .filter(|l| l.starts_with('T'))
        .map(|l| u32::from_str_radix(&l[7..9], 16).unwrap())
        .sum();
    assert_eq!(length, text);
    // the literal is placed once
    assert_eq!(length, 3 + 3 + 2 + 3 + 1);
}

#[test]
fn session_keeps_symbols_until_cleared() {
    let source = "FIRST   LDA     #1\n";
    let mut session = Session::new();
    assert!(session.assemble(source).is_ok());
    assert!(session.symbols.contains_symbol("FIRST", "OUTPUT"));

    let err = session.assemble(source).unwrap_err();
    assert_eq!(
        err.kind(),
        Some(&sicasm::Invalid::DuplicateLabel("FIRST".to_string()))
    );

    session.clear();
    assert!(!session.symbols.contains_symbol("FIRST", "OUTPUT"));
    assert!(session.assemble(source).is_ok());
}

#[test]
fn symbols_export() {
    let mut session = Session::new();
    session
        .build("COPY    START   1000\nFIRST   LDA     #3\nZERO    EQU     0\n")
        .unwrap();
    let yaml = session.symbols.to_yaml().unwrap();
    println!("{yaml}");
    assert!(yaml.contains("COPY:"));
    assert!(yaml.contains("FIRST:"));
    assert!(yaml.contains("address: '001000'") || yaml.contains("address: \"001000\""));
    assert!(yaml.contains("(default)"));
}
