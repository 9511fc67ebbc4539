use clap::Parser;
use color_print::cprintln;
use std::process::exit;

use sicasm::msg::{self, Msg};
use sicasm::{listing, Error, ObjectWriter, Session};

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Input file
    #[clap(default_value = "main.asm")]
    input: String,

    /// Output file
    #[clap(short, long, default_value = "main.obj")]
    output: String,

    /// Dump the assembly listing
    #[clap(short, long)]
    dump: bool,

    /// Mnemonic table (`MNEMONIC OPCODE FORMAT` per line)
    #[clap(long)]
    optab: Option<String>,

    /// Register table (`NAME NUMBER` per line)
    #[clap(long)]
    regtab: Option<String>,

    /// Write the symbol table as YAML
    #[clap(long)]
    symbols: Option<String>,

    /// Deepest macro nesting accepted
    #[clap(long, default_value_t = 64)]
    max_depth: usize,

    /// Print per-section summaries
    #[clap(short, long)]
    verbose: bool,
}

fn read(path: &str) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|e| Error::FileOpen(path.to_string(), e))
}

fn session(args: &Args) -> Result<Session, Error> {
    let mut session = Session::new();
    if let Some(path) = &args.optab {
        let (table, warnings) = arch::OpTable::parse(&read(path)?);
        msg::table_warnings(path, &warnings);
        session.optab = table;
    }
    if let Some(path) = &args.regtab {
        let (table, warnings) = arch::RegTable::parse(&read(path)?);
        msg::table_warnings(path, &warnings);
        session.regs = table;
    }
    session.options.max_macro_depth = args.max_depth;
    Ok(session)
}

fn run(args: &Args) -> Result<(), Error> {
    println!("1. Read Source");
    println!("  < {}", args.input);
    let source = read(&args.input)?;
    let mut session = session(args)?;

    println!("2. Build Sections");
    let sections = session.build(&source)?;
    if args.verbose {
        for section in &sections {
            cprintln!(
                "  - <g>{}</> start <y>{}</> length <y>{}</> ({} statements)",
                section.name.trim_end(),
                section.start.render(6),
                section.length.render(6),
                section.stmts.len()
            );
        }
    }

    println!("3. Write Object Program");
    println!("  > {}", args.output);
    let file = std::fs::File::create(&args.output)
        .map_err(|e| Error::FileCreate(args.output.clone(), e))?;
    let mut writer = ObjectWriter::new(std::io::BufWriter::new(file));
    for section in &sections {
        writer.execute(section, &session.symbols)?;
    }

    if let Some(path) = &args.symbols {
        println!("  > {}", path);
        let yaml = session.symbols.to_yaml()?;
        std::fs::write(path, yaml).map_err(|e| Error::FileCreate(path.clone(), e))?;
    }

    if args.dump {
        listing::print_dump(&sections, &session.symbols, &session.regs);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    println!("SIC/XE Assembler");

    if let Err(err) = run(&args) {
        err.print_diag(&args.input);
        Msg::Note("assembly aborted".to_string()).print();
        exit(1);
    }
}
