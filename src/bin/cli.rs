use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use itertools::Itertools;
use kuizzz::db::queries::categories::{get_all_categories, import_categories};
use kuizzz::db::queries::questions::{get_all_questions, import_questions};
use kuizzz::db::queries::users::{get_users, import_users};
use kuizzz::db::{self, Category, Question, Role, User};
use kuizzz::telemetry::init_tracing;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Database path
    db_path: PathBuf,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import categories, questions and users from a directory of CSV files
    Import { path: PathBuf },
    /// Export categories, questions and users to a directory of CSV files
    Export { path: PathBuf },
}

/// CSV has no nesting, so the question kind travels as a JSON column.
#[derive(Serialize, Deserialize)]
struct QuestionRecord {
    id: i64,
    category_id: Option<i64>,
    prompt: String,
    kind: String,
    hidden: bool,
    ordering: i64,
}

/// Roles are joined with `;`.
#[derive(Serialize, Deserialize)]
struct UserRecord {
    id: i64,
    username: String,
    display_name: String,
    email: String,
    roles: String,
}

impl TryFrom<&Question> for QuestionRecord {
    type Error = serde_json::Error;

    fn try_from(q: &Question) -> Result<Self, Self::Error> {
        Ok(QuestionRecord {
            id: q.id,
            category_id: q.category_id,
            prompt: q.prompt.clone(),
            kind: serde_json::to_string(&q.kind)?,
            hidden: q.hidden,
            ordering: q.ordering,
        })
    }
}

impl TryFrom<QuestionRecord> for Question {
    type Error = anyhow::Error;

    fn try_from(r: QuestionRecord) -> Result<Self, Self::Error> {
        Ok(Question {
            id: r.id,
            category_id: r.category_id,
            prompt: r.prompt,
            kind: serde_json::from_str(&r.kind)
                .with_context(|| format!("Invalid kind for question {}", r.id))?,
            hidden: r.hidden,
            ordering: r.ordering,
        })
    }
}

impl From<&User> for UserRecord {
    fn from(u: &User) -> Self {
        UserRecord {
            id: u.id,
            username: u.username.clone(),
            display_name: u.display_name.clone(),
            email: u.email.clone(),
            roles: u.roles.iter().join(";"),
        }
    }
}

impl TryFrom<UserRecord> for User {
    type Error = anyhow::Error;

    fn try_from(r: UserRecord) -> Result<Self, Self::Error> {
        let roles = r
            .roles
            .split(';')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<Role>().map_err(anyhow::Error::msg))
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("Invalid roles for user {}", r.id))?;
        Ok(User {
            id: r.id,
            username: r.username,
            display_name: r.display_name,
            email: r.email,
            roles,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let db_path = cli.db_path.display().to_string();
    let pool = db::establish_connection(&db_path)
        .await
        .with_context(|| format!("Cannot connect to DB {db_path}"))?;
    db::run_migrations(&pool).await?;
    match cli.command {
        Commands::Export { path } => export_data(&pool, &path).await.context("Cannot export"),
        Commands::Import { path } => import_data(&pool, &path).await.context("Cannot import"),
    }
}

fn write_to(path: PathBuf, data: impl IntoIterator<Item = impl Serialize>) -> anyhow::Result<()> {
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    let mut wtr = csv::Writer::from_writer(file);
    for line in data {
        wtr.serialize(line)?;
    }
    wtr.flush()?;
    Ok(())
}

fn read_from<T: DeserializeOwned>(path: PathBuf) -> anyhow::Result<Vec<T>> {
    let file =
        std::fs::File::open(&path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut out = Vec::new();
    for record in rdr.deserialize() {
        let record: T = record?;
        out.push(record);
    }
    Ok(out)
}

async fn export_data(pool: &SqlitePool, path: &Path) -> anyhow::Result<()> {
    let categories = get_all_categories(pool, true).await?;
    let questions = get_all_questions(pool, true)
        .await?
        .iter()
        .map(QuestionRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let users = get_users(pool).await?;
    if !path.exists() {
        std::fs::create_dir_all(path)?
    }
    write_to(path.join("categories.csv"), categories)?;
    write_to(path.join("questions.csv"), questions)?;
    write_to(path.join("users.csv"), users.iter().map(UserRecord::from))?;
    tracing::info!(path = %path.display(), "Exported data");
    Ok(())
}

async fn import_data(pool: &SqlitePool, path: &Path) -> anyhow::Result<()> {
    let categories: Vec<Category> = read_from(path.join("categories.csv"))?;
    let questions = read_from::<QuestionRecord>(path.join("questions.csv"))?
        .into_iter()
        .map(Question::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;
    let users = read_from::<UserRecord>(path.join("users.csv"))?
        .into_iter()
        .map(User::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;
    import_users(pool, users).await?;
    import_categories(pool, categories).await?;
    import_questions(pool, questions).await?;
    tracing::info!(path = %path.display(), "Imported data");
    Ok(())
}
