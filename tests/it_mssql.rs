use rquery_repo::{
    col, connect_mssql, val, Crud, DataSource, GenericRepository, Pageable, QueryExecutor, Record,
    RepoError, SqlGeneratorFactory, SqlParam,
};

#[derive(Record, Debug, Clone, PartialEq)]
#[table(name = "Employees")]
struct Employee {
    #[key(name = "EmployeeId")]
    pub id: i32,
    #[column(name = "FirstName")]
    pub first_name: String,
    #[column(name = "CountryId")]
    pub country_id: String,
    #[column(name = "HireDate")]
    pub hire_date: chrono::NaiveDateTime,
}

fn employee(first_name: &str, country_id: &str) -> Employee {
    Employee {
        id: 0,
        first_name: first_name.to_string(),
        country_id: country_id.to_string(),
        hire_date: chrono::NaiveDate::from_ymd_opt(2019, 11, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
    }
}

async fn repo() -> anyhow::Result<GenericRepository<Employee>> {
    let db = connect_mssql("localhost", 1433, "tempdb", "sa", "YourStrong!Passw0rd").await?;
    let source = db.into_source();
    source
        .execute(
            "IF OBJECT_ID('Employees') IS NOT NULL DROP TABLE Employees",
            &[],
        )
        .await?;
    source
        .execute(
            "CREATE TABLE Employees (EmployeeId INT IDENTITY(1,1) PRIMARY KEY, \
             FirstName NVARCHAR(100) NOT NULL, CountryId NVARCHAR(3) NOT NULL, \
             HireDate DATETIME2 NOT NULL)",
            &[],
        )
        .await?;
    Ok(GenericRepository::<Employee>::new(source, &SqlGeneratorFactory::new()).await?)
}

#[tokio::test]
#[ignore]
async fn it_mssql_identity_insert_and_paging() -> anyhow::Result<()> {
    let repo = repo().await?;
    assert_eq!(repo.generator_name(), "Sql2008SqlGenerator");

    let saved = repo
        .save_all(vec![
            employee("Ana", "Mex"),
            employee("Luis", "Mex"),
            employee("Eva", "Col"),
        ])
        .await?;
    assert_eq!(saved.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2, 3]);

    let page = repo.find_page(Pageable::of(0, 2)).await?;
    assert_eq!(page.total_elements, 3);
    assert_eq!(page.content[0].first_name, "Ana");

    let mex = repo
        .find_all_where(col!("CountryId").eq(val!("Mex")).into())
        .await?;
    assert_eq!(mex.len(), 2);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn it_mssql_update_missing_row() -> anyhow::Result<()> {
    let repo = repo().await?;
    let mut ghost = employee("Ghost", "Mex");
    ghost.id = 404;
    let err = repo.update(&ghost).await.unwrap_err();
    assert!(matches!(err, RepoError::NoRecordUpdated { .. }));
    assert!(repo.find_one(SqlParam::I32(404)).await?.is_none());
    Ok(())
}
