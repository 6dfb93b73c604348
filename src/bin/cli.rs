//! `uartboot` command line interface.

use std::{process, time::Duration};

use clap::{crate_description, crate_name, crate_version, value_t, App, AppSettings::*, Arg};
use console::style;
use log::{debug, trace, LevelFilter};
use simplelog::*;

use uartboot::{self as ub, CancelToken};

fn main() {
    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .about(crate_description!())
        .long_about(
            "\n\
            uartboot pushes a boot image to a bootloader waiting on a serial \
            line, then turns into a simple terminal: anything the board prints \
            is shown and anything typed is sent to the board. Press Ctrl+C to \
            leave.\n\
            \n\
            The image is sent as a single packet, all words little endian: \n\
               \t* the magic word 0x9e9e9e9e \n\
               \t* the offset the image is to be loaded at \n\
               \t* the size of the image in bytes \n\
               \t* the image itself \n\
            \n\
            Nothing is acknowledged by the bootloader. If the transfer fails, \
            reset the board and start again.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(
            Arg::with_name("DEVICE")
                .help("the serial device the board is connected to")
                .index(1),
        )
        .arg(
            Arg::with_name("FILE")
                .help("path to the boot image to be pushed")
                .index(2),
        )
        .arg(
            Arg::with_name("OFFSET")
                .help("address the image is to be loaded at")
                .long_help(
                    "address the image is to be loaded at; accepts decimal, \
                     0x/0o/0b prefixed numbers and integer expressions such as \
                     `0x80000000 + 64 * 1024` or `1 << 20`. Operators: \
                     + - * / // % << >> & ^ | and parentheses; division \
                     rounds down.",
                )
                .index(3),
        )
        .arg(
            Arg::with_name("BAUD_RATE")
                .help("serial port baud rate")
                .short("b")
                .long("baud-rate")
                .takes_value(true)
                .default_value("115200"),
        )
        .arg(
            Arg::with_name("SLICE_LEN")
                .help("number of bytes per write while pushing the image")
                .long_help(
                    "number of bytes per write while pushing the image; \
                     smaller slices give finer progress and a chance to show \
                     what the board prints during the transfer.",
                )
                .short("s")
                .long("slice-len")
                .takes_value(true)
                .default_value("1"),
        )
        .arg(
            Arg::with_name("TIMEOUT")
                .help("serial port read timeout in milliseconds")
                .long("timeout")
                .takes_value(true)
                .default_value("1000"),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'uartboot -v -v -v' or 'uartboot -vvv' vs 'uartboot -v'
    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if let Err(e) = TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("failed to initialize logging: {}", e);
    }

    trace!("{:#?}", matches);

    // Positional arguments ====================================================

    let (device, image, offset) = match (
        matches.value_of("DEVICE"),
        matches.value_of("FILE"),
        matches.value_of("OFFSET"),
    ) {
        (Some(device), Some(image), Some(offset)) => (device, image, offset),
        _ => {
            println!("{}", matches.usage());
            println!();
            let ports = ub::list_ports();
            if ports.is_empty() {
                println!("no serial devices found");
            } else {
                println!("available devices:");
                for port in ports {
                    println!("  {}", port);
                }
            }
            process::exit(2);
        }
    };

    let offset = ub::parse_offset(offset).unwrap_or_else(|e| {
        println!("{}: {}", style("error").red(), e);
        process::exit(2);
    });

    // Arguments with default values ===========================================

    // It's safe to call unwrap on all command line arguments with default
    // values, because the value with either be what the user input at runtime
    // or the default value

    let baud_rate = numeric::<u32>(&matches, "BAUD_RATE", "baud-rate");
    let slice_len = numeric::<usize>(&matches, "SLICE_LEN", "slice-len");
    let timeout = numeric::<u64>(&matches, "TIMEOUT", "timeout");
    if slice_len == 0 {
        println!(
            "{}: `{}` must be at least 1",
            style("error").red(),
            style("slice-len").cyan()
        );
        process::exit(2);
    }

    // END - Arguments =========================================================

    let settings = ub::SettingsBuilder::new()
        .path(device)
        .image(image)
        .offset(offset)
        .baud_rate(baud_rate)
        .slice_len(slice_len)
        .timeout(Duration::from_millis(timeout))
        .finalize();
    debug!("{:#?}", settings);

    // In raw mode Ctrl+C is read as a key; outside of it, it is a signal.
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!("🛑 received Ctrl+C!");
        handler_token.cancel();
    }) {
        println!("{}: cannot install the Ctrl+C handler: {}", style("error").red(), e);
        process::exit(1);
    }

    // Run the state machine ===================================================

    println!("[UB] uartboot v{} on {}", crate_version!(), style(device).cyan());
    let mut session = ub::factory(settings, cancel);
    let exit_code = session.run();
    debug!("exit code: {}", exit_code);
    process::exit(exit_code);
}

fn numeric<T: std::str::FromStr>(matches: &clap::ArgMatches, name: &str, flag: &str) -> T {
    value_t!(matches.value_of(name), T).unwrap_or_else(|_| {
        println!(
            "{}: `{}` needs to be a numeric value",
            style("error").red(),
            style(flag).cyan()
        );
        println!(
            "   {} `{}` is not a valid value",
            style("-->").cyan(),
            style(matches.value_of(name).unwrap_or_default()).on_red()
        );
        process::exit(2);
    })
}
