use chrono::NaiveDateTime;
use rquery_repo::{
    col, connect, val, Crud, DataSource, DbConfig, DbKind, GenericRepository, Pageable,
    QueryExecutor, Record, Sort, SqlGeneratorFactory,
};
use tracing_subscriber::EnvFilter;

#[derive(Record, Debug, Clone)]
#[table(name = "employees")]
pub struct Employee {
    #[key(name = "employee_id")]
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub hire_date: NaiveDateTime,
}

fn create_table(kind: DbKind) -> &'static str {
    match kind {
        DbKind::Mssql => {
            "IF OBJECT_ID('employees') IS NULL CREATE TABLE employees (\
             employee_id BIGINT IDENTITY(1,1) PRIMARY KEY, first_name NVARCHAR(100), \
             last_name NVARCHAR(100), age INT, hire_date DATETIME2)"
        }
        DbKind::Postgres => {
            "CREATE TABLE IF NOT EXISTS employees (employee_id BIGSERIAL PRIMARY KEY, \
             first_name TEXT, last_name TEXT, age INTEGER, hire_date TIMESTAMP)"
        }
        DbKind::Sqlite => {
            "CREATE TABLE IF NOT EXISTS employees (employee_id INTEGER PRIMARY KEY, \
             first_name TEXT, last_name TEXT, age INTEGER, hire_date TIMESTAMP)"
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // RQUERY_DB_KIND=postgres RQUERY_DB_NAME=mydb ... or an in-memory SQLite database
    let config = DbConfig::from_env()?;
    let source = connect(&config).await?.into_source();
    source.execute(create_table(config.kind), &[]).await?;

    let factory = SqlGeneratorFactory::new();
    let employees = GenericRepository::<Employee>::new(source, &factory).await?;

    let hired = chrono::Utc::now().naive_utc();
    let ana = employees
        .save(Employee {
            id: 0,
            first_name: "Ana".into(),
            last_name: "Ruiz".into(),
            age: 34,
            hire_date: hired,
        })
        .await?;
    println!("saved {:?}", ana);

    let page = employees
        .find_page_where(
            col!(Employee::age).ge(val!(30)).into(),
            Pageable::of(0, 10).sorted(Sort::desc(Employee::hire_date)),
        )
        .await?;
    println!(
        "page {} of {}: {} rows ({} total)",
        page.number + 1,
        page.total_pages,
        page.content.len(),
        page.total_elements
    );
    println!("count: {}", employees.count().await?);
    Ok(())
}
