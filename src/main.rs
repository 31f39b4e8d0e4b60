use clap::Parser;
use instrument_reader::cli::{self, Args};
use std::process;

fn main() {
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    match cli::run(args) {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("Instrument Reader - TOA5 and STR time window loader");
    println!("===================================================");
    println!();
    println!("Find Campbell Scientific TOA5 (.dat) or Aerodyne TDLWintel (.str) files");
    println!("and load the records inside a time window into one time-ordered table.");
    println!();
    println!("USAGE:");
    println!("    instrument-reader <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    load        Load a time window and print or write the table");
    println!("    list        List the files a bounded directory walk finds");
    println!("    coverage    Show the time span each file covers");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("EXAMPLES:");
    println!("    # Load one hour of TDL data:");
    println!("    instrument-reader load /data/tdl --format str \\");
    println!("                           --from \"2014-01-13 09:00\" --to \"2014-01-13 10:00\"");
    println!();
    println!("    # Export one logger table to Parquet:");
    println!("    instrument-reader load /data/tower --format toa5 --root '^CR1000_Met' \\");
    println!("                           --columns AirT,RH --output met.parquet");
    println!();
    println!("For detailed help on any command, use:");
    println!("    instrument-reader <COMMAND> --help");
}
