//! Driver listing commands.

use tollgate::{
    Drivers,
    constants::{ENCRYPTION_GROUP, STORAGE_GROUP},
    registry::IdentityKind,
};

use crate::cli::DriverArgs;
use crate::output::{OutputFormat, driver_rows, print_table};

/// Run the `store` command
pub fn storage(args: &DriverArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    show(STORAGE_GROUP, args, format)
}

/// Run the `encrypt` command
pub fn encryption(
    args: &DriverArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    show(ENCRYPTION_GROUP, args, format)
}

fn show(
    group: &str,
    args: &DriverArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let drivers = Drivers::builtin()?;

    if let Some(name) = &args.name {
        let help = drivers.help(group, name, IdentityKind::Long)?;
        match format {
            OutputFormat::Human => println!("{help}"),
            OutputFormat::Json => {
                let value = serde_json::json!({ "name": name, "help": help });
                println!("{}", serde_json::to_string(&value)?);
            }
        }
        return Ok(());
    }

    let members = drivers.list_members(group)?;
    match format {
        OutputFormat::Human => {
            if members.is_empty() {
                println!("No {group} drivers registered.");
                return Ok(());
            }
            print_table(&["NAME", "FLAGS", "DESCRIPTION"], &driver_rows(&members));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&members)?),
    }
    Ok(())
}
