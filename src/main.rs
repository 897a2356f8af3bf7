use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use std::path::Path;
use tasksheet::export;
use tasksheet::normalizer::parse_percentage;
use tasksheet::FileFormat;
use tasksheet::Options;
use tasksheet::Table;

fn main() {
    let matches = cli().get_matches();
    let level = if matches.get_flag("verbose") { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run(&matches) {
        match error.downcast_ref::<tasksheet::TaskSheetError>() {
            Some(error) => eprintln!("{}", tasksheet::render_error(error)),
            None => eprintln!("❌ Error: {error:#}"),
        }
        std::process::exit(1);
    }
}

fn cli() -> Command {
    Command::new("tasksheet")
        .about("Analyze, normalize and convert project task spreadsheets")
        .subcommand_required(true)
        .arg(Arg::new("verbose").long("verbose").short('v').global(true).action(ArgAction::SetTrue).help("Log at debug level"))
        .arg(Arg::new("options").long("options").global(true).help("JSON file with read criteria and schema"))
        .subcommand(
            Command::new("analyze")
                .about("Check a file against the task schema")
                .arg(Arg::new("file").required(true)),
        )
        .subcommand(
            Command::new("ingest")
                .about("Normalize an upload and write it out as .xlsx or .csv")
                .arg(Arg::new("file").required(true))
                .arg(Arg::new("output").required(true)),
        )
        .subcommand(
            Command::new("convert")
                .about("Rewrite a file as .xlsx or .csv without normalizing it")
                .arg(Arg::new("file").required(true))
                .arg(Arg::new("output").required(true)),
        )
        .subcommand(
            Command::new("view")
                .about("Print the task list with display progress")
                .arg(Arg::new("file").required(true))
                .arg(Arg::new("filter").long("filter").action(ArgAction::Append).help("COLUMN=VALUE, repeatable")),
        )
        .subcommand(
            Command::new("progress")
                .about("Set the progress of a task in a stored file")
                .arg(Arg::new("file").required(true))
                .arg(Arg::new("task").required(true))
                .arg(Arg::new("percentage").required(true).help("0-100, optionally with a trailing %")),
        )
}

fn run(matches: &ArgMatches) -> Result<()> {
    let options = load_options(matches.get_one::<String>("options"))?;
    match matches.subcommand() {
        Some(("analyze", sub)) => {
            let result = tasksheet::analyze_path(arg(sub, "file")?, &options)?;
            println!("{}", tasksheet::render_report(&result));
        }
        Some(("ingest", sub)) => {
            let file = arg(sub, "file")?;
            let bytes = std::fs::read(file).with_context(|| format!("Failed to read {file}"))?;
            let ingested = tasksheet::ingest(&bytes, file, &options)?;
            if let Some(analysis) = &ingested.analysis {
                println!("{}", tasksheet::render_report(analysis));
            }
            write_table(&ingested.table, arg(sub, "output")?)?;
        }
        Some(("convert", sub)) => {
            let (_, table) = tasksheet::read_table_from_path(arg(sub, "file")?, &options.criteria)?;
            write_table(&table, arg(sub, "output")?)?;
        }
        Some(("view", sub)) => {
            let (_, table) = tasksheet::read_table_from_path(arg(sub, "file")?, &options.criteria)?;
            let filters = sub
                .get_many::<String>("filter")
                .unwrap_or_default()
                .map(|filter| parse_filter(filter))
                .collect::<Result<Vec<_>>>()?;
            let view = tasksheet::filter_for_display(&table, &filters, &options.schema);
            println!("{}", view.columns.join(" | "));
            for row in &view.rows {
                let cells: Vec<String> = row.cells.iter().map(|cell| cell.to_string()).collect();
                println!("{:>4}  {}  [{}] {}%", row.index, cells.join(" | "), row.color.css(), row.width);
            }
        }
        Some(("progress", sub)) => {
            let file = arg(sub, "file")?;
            let percentage = parse_percentage(arg(sub, "percentage")?)?;
            let (_, mut table) = tasksheet::read_table_from_path(file, &options.criteria)?;
            let updated = tasksheet::update_progress(&mut table, arg(sub, "task")?, percentage, &options.schema)?;
            write_table(&table, file)?;
            println!("Updated {updated} rows");
        }
        Some((other, _)) => bail!("Unknown command '{other}'"),
        None => bail!("No command given"),
    }
    Ok(())
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("Missing argument <{name}>"))
}

fn load_options(path: Option<&String>) -> Result<Options> {
    let Some(path) = path else {
        return Ok(Options::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read options file {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid options file {path}"))
}

fn parse_filter(filter: &str) -> Result<(String, String)> {
    let (column, value) = filter
        .split_once('=')
        .with_context(|| format!("Filter '{filter}' must look like COLUMN=VALUE"))?;
    Ok((column.trim().to_owned(), value.trim().to_owned()))
}

fn write_table(table: &Table, output: &str) -> Result<()> {
    let bytes = match FileFormat::from_path(Path::new(output))? {
        FileFormat::Xlsx => export::to_xlsx(table)?,
        FileFormat::Csv => export::to_csv(table)?.into_bytes(),
        other => bail!("Cannot write {other} files"),
    };
    std::fs::write(output, bytes).with_context(|| format!("Failed to write {output}"))?;
    tracing::info!(target: "tasksheet::export", output = %output, rows = table.len(), "wrote table");
    Ok(())
}
