//! Line-oriented front-end: login page, dashboard and the add-animal form.
//!
//! All database work goes through the [`SessionHandle`], so the prompt loop
//! only ever waits on actor replies.

use crate::assets::AssetCatalog;
use crate::config::{Config, Credentials};
use crate::db::batch::ColumnBatch;
use crate::db::models::Animal;
use crate::db::postgres::InsertReport;
use crate::error::AppError;
use crate::service::session_actor::SessionHandle;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

/// Raw answers from the add-animal prompt.
#[derive(Debug, Default, Clone)]
pub struct AnimalForm {
    pub name: String,
    pub age: String,
    pub sex: String,
    pub species: String,
    pub subspecies: String,
    pub genus: String,
}

impl AnimalForm {
    /// Validate the form into an animal of `animal_class`.
    pub fn into_animal(self, id: i64, animal_class: &str) -> Result<Animal, String> {
        let required = |label: &str, v: &str| -> Result<String, String> {
            let v = v.trim();
            if v.is_empty() {
                Err(format!("{label} is required."))
            } else {
                Ok(v.to_string())
            }
        };
        let optional = |v: &str| Some(v.trim().to_string()).filter(|s| !s.is_empty());

        let name = required("Name", &self.name)?;
        let age: f64 = self
            .age
            .trim()
            .parse()
            .map_err(|_| format!("Age must be a number, got {:?}.", self.age.trim()))?;
        if !(age.is_finite() && age >= 0.0) {
            return Err("Age must be zero or more.".to_string());
        }
        let species = required("Species", &self.species)?;
        let subspecies = required("Subspecies", &self.subspecies)?;

        let mut animal = Animal::new(id, animal_class, name, age, species, subspecies);
        animal.sex = optional(&self.sex);
        animal.taxonomy.genus = optional(&self.genus);
        Ok(animal)
    }
}

/// A dashboard command line, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List(Option<String>),
    Add(String),
    Import { table: String, file: String },
    Logout,
    Exit,
    Help,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let head = parts.next().unwrap_or("").to_ascii_lowercase();
        let rest: Vec<&str> = parts.collect();
        match (head.as_str(), rest.as_slice()) {
            ("list", []) => Command::List(None),
            ("list", [class]) => Command::List(Some(class.to_string())),
            ("add", [class]) => Command::Add(class.to_string()),
            ("import", [table, file]) => Command::Import {
                table: table.to_string(),
                file: file.to_string(),
            },
            ("logout", []) => Command::Logout,
            ("exit" | "quit", []) => Command::Exit,
            ("help" | "", _) => Command::Help,
            _ => Command::Unknown(line.trim().to_string()),
        }
    }
}

enum DashboardExit {
    Logout,
    Exit,
}

pub struct Console {
    handle: SessionHandle,
    config: Config,
    assets: AssetCatalog,
    lines: Lines<BufReader<Stdin>>,
}

impl Console {
    pub fn new(handle: SessionHandle, config: Config) -> Self {
        let assets = AssetCatalog::new(config.assets_dir.clone());
        Self {
            handle,
            config,
            assets,
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    pub async fn run(mut self) -> Result<(), AppError> {
        loop {
            let Some(username) = self.login_page().await? else {
                break;
            };
            match self.dashboard(&username).await? {
                DashboardExit::Logout => {
                    self.handle.logout().await;
                    continue;
                }
                DashboardExit::Exit => break,
            }
        }
        self.handle.logout().await;
        Ok(())
    }

    async fn prompt(&mut self, label: &str) -> Result<Option<String>, AppError> {
        let mut out = tokio::io::stdout();
        out.write_all(label.as_bytes()).await?;
        out.flush().await?;
        Ok(self.lines.next_line().await?)
    }

    /// Returns the logged-in username, or `None` when the user leaves.
    async fn login_page(&mut self) -> Result<Option<String>, AppError> {
        println!("\n=== Log in into your account ===  (type 'exit' to quit)");
        loop {
            let Some(username) = self.prompt("Username: ").await? else {
                return Ok(None);
            };
            let username = username.trim().to_string();
            if username.eq_ignore_ascii_case("exit") {
                return Ok(None);
            }
            let Some(password) = self.prompt("Password: ").await? else {
                return Ok(None);
            };

            let creds = if username.is_empty() {
                match self.config.default_credentials() {
                    Some(c) => c,
                    None => {
                        println!("Username is required.");
                        continue;
                    }
                }
            } else {
                Credentials::new(username, password.trim_end_matches(['\r', '\n']))
            };

            match self.handle.login(creds).await? {
                Ok(user) => return Ok(Some(user)),
                Err(message) => println!("{message}"),
            }
        }
    }

    async fn dashboard(&mut self, username: &str) -> Result<DashboardExit, AppError> {
        println!("\n=== Dashboard ({username}) ===");
        for icon in self.assets.class_icons(&self.config.animal_classes) {
            let marker = if icon.present { "" } else { " (no icon)" };
            println!("  [{}] {}{}", icon.class, icon.icon.display(), marker);
        }
        print_help();

        loop {
            let Some(line) = self.prompt("> ").await? else {
                return Ok(DashboardExit::Exit);
            };
            match Command::parse(&line) {
                Command::List(class) => self.list(class).await,
                Command::Add(class) => self.add(&class).await?,
                Command::Import { table, file } => self.import(&table, Path::new(&file)).await,
                Command::Logout => return Ok(DashboardExit::Logout),
                Command::Exit => return Ok(DashboardExit::Exit),
                Command::Help => print_help(),
                Command::Unknown(cmd) => println!("Unknown command: {cmd}"),
            }
        }
    }

    async fn list(&self, class: Option<String>) {
        match self.handle.list_animals(class).await {
            Ok(animals) if animals.is_empty() => println!("No animals logged yet."),
            Ok(animals) => {
                for animal in animals {
                    println!("  #{} [{}] {}", animal.id, animal.animal_class, animal);
                }
            }
            Err(AppError::Fetch(e)) => println!("{}", e.user_message()),
            Err(e) => println!("Error: {e}"),
        }
    }

    async fn add(&mut self, class: &str) -> Result<(), AppError> {
        if !self.config.animal_classes.iter().any(|c| c == class) {
            println!(
                "Unknown animal class '{class}'. Choose one of: {}",
                self.config.animal_classes.join(", ")
            );
            return Ok(());
        }

        let mut form = AnimalForm::default();
        for (label, slot) in [
            ("Name: ", &mut form.name),
            ("Age: ", &mut form.age),
            ("Sex (optional): ", &mut form.sex),
            ("Species: ", &mut form.species),
            ("Subspecies: ", &mut form.subspecies),
            ("Genus (optional): ", &mut form.genus),
        ] {
            let Some(answer) = self.prompt(label).await? else {
                return Ok(());
            };
            *slot = answer;
        }

        let id = chrono::Utc::now().timestamp_micros();
        let animal = match form.into_animal(id, class) {
            Ok(a) => a,
            Err(msg) => {
                println!("{msg}");
                return Ok(());
            }
        };
        info!(animal = %animal, "adding animal");
        match self.handle.add_animals(vec![animal]).await {
            Ok(report) => print_report(&report),
            Err(AppError::Fetch(e)) => println!("{}", e.user_message()),
            Err(e) => println!("Error: {e}"),
        }
        Ok(())
    }

    async fn import(&self, table: &str, file: &Path) {
        let batch = match tokio::fs::read_to_string(file)
            .await
            .map_err(AppError::from)
            .and_then(|s| serde_json::from_str::<ColumnBatch>(&s).map_err(AppError::from))
        {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %file.display(), error = %e, "could not read batch file");
                println!("Could not read {}: {e}", file.display());
                return;
            }
        };
        match self.handle.insert_batch(table, batch).await {
            Ok(report) => print_report(&report),
            Err(AppError::Fetch(e)) => println!("{}", e.user_message()),
            Err(e) => println!("Error: {e}"),
        }
    }
}

fn print_help() {
    println!("Commands: list [class] | add <class> | import <table> <file.json> | logout | exit");
}

fn print_report(report: &InsertReport) {
    println!(
        "Stored {} row(s) in '{}'; {} batch(es) skipped.",
        report.stored_rows(),
        report.table,
        report.skipped_batches()
    );
}
