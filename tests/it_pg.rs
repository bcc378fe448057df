use rquery_repo::{
    col, connect_postgres, val, Crud, DataSource, GenericRepository, Pageable, QueryExecutor,
    Record, Sort, SqlGeneratorFactory, SqlParam,
};

#[derive(Record, Debug, Clone, PartialEq)]
#[table(name = "employees")]
struct Employee {
    #[key(name = "employee_id")]
    pub id: i32,
    pub first_name: String,
    pub country_id: String,
    pub hire_date: chrono::NaiveDateTime,
}

fn employee(first_name: &str, country_id: &str) -> Employee {
    Employee {
        id: 0,
        first_name: first_name.to_string(),
        country_id: country_id.to_string(),
        hire_date: chrono::NaiveDate::from_ymd_opt(2021, 3, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap(),
    }
}

async fn repo() -> anyhow::Result<GenericRepository<Employee>> {
    let db = connect_postgres(
        "localhost",
        5432,
        "tempdb",
        "postgres",
        "YourStrong!Passw0rd",
    )
    .await?;
    let source = db.into_source();
    source
        .execute("DROP TABLE IF EXISTS employees", &[])
        .await?;
    source
        .execute(
            "CREATE TABLE employees (employee_id SERIAL PRIMARY KEY, first_name TEXT NOT NULL, \
             country_id TEXT NOT NULL, hire_date TIMESTAMP NOT NULL)",
            &[],
        )
        .await?;
    Ok(GenericRepository::<Employee>::new(source, &SqlGeneratorFactory::new()).await?)
}

#[tokio::test]
#[ignore]
async fn it_pg_crud_cycle() -> anyhow::Result<()> {
    let repo = repo().await?;
    assert_eq!(repo.generator_name(), "LimitOffsetSqlGenerator");

    let ana = repo.save(employee("Ana", "Mex")).await?;
    assert!(ana.id > 0);
    assert!(repo.exists(SqlParam::I32(ana.id)).await?);

    let mut renamed = ana.clone();
    renamed.first_name = "Ana Maria".to_string();
    assert_eq!(repo.update(&renamed).await?, 1);
    assert_eq!(
        repo.get_one(SqlParam::I32(ana.id)).await?.first_name,
        "Ana Maria"
    );

    assert_eq!(repo.delete(SqlParam::I32(ana.id)).await?, 1);
    assert!(repo.find_one(SqlParam::I32(ana.id)).await?.is_none());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn it_pg_paging() -> anyhow::Result<()> {
    let repo = repo().await?;
    let batch = (0..7)
        .map(|i| employee(&format!("emp {}", i), if i % 2 == 0 { "Mex" } else { "Col" }))
        .collect::<Vec<_>>();
    repo.save_all(batch).await?;

    let page = repo
        .find_page(Pageable::of(1, 3).sorted(Sort::asc("employee_id")))
        .await?;
    assert_eq!(page.total_elements, 7);
    assert_eq!(page.content.len(), 3);

    let mex = repo
        .find_page_where(
            col!("country_id").eq(val!("Mex")).into(),
            Pageable::of(0, 10),
        )
        .await?;
    assert_eq!(mex.total_elements, 4);
    assert!(mex.content.iter().all(|e| e.country_id == "Mex"));
    Ok(())
}
