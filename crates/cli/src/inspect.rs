use modulizer_core::naming::automatic_module_name;
use modulizer_core::packages::discover_packages;
use std::path::PathBuf;

pub fn run(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let name = automatic_module_name(&path)?;
    let packages = discover_packages(&path)?;

    println!("Automatic module name: {}", name);
    println!("Packages ({}):", packages.len());
    for package in &packages {
        println!(" - {}", package);
    }
    Ok(())
}
