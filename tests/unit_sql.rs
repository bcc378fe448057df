use rquery_repo::{
    DefaultSqlGenerator, LimitOffsetSqlGenerator, Oracle9SqlGenerator, Pageable, Sort,
    Sql2008SqlGenerator, SqlGenerator, TableDescription,
};

fn users() -> TableDescription {
    TableDescription::new(
        "users",
        vec!["first_name".to_string(), "last_name".to_string()],
        vec!["id".to_string()],
    )
}

#[test]
fn select_all_uses_pk_then_columns() {
    let sql = DefaultSqlGenerator.select_all(&users());
    assert_eq!(sql, "SELECT id, first_name, last_name FROM users");
}

#[test]
fn select_by_pk_and_pks() {
    let g = DefaultSqlGenerator;
    assert_eq!(
        g.select_by_pk(&users()),
        "SELECT id, first_name, last_name FROM users WHERE id = ?"
    );
    assert_eq!(
        g.select_by_pks(&users(), 3),
        "SELECT id, first_name, last_name FROM users WHERE id IN (?, ?, ?)"
    );
}

#[test]
fn exists_and_count() {
    let g = DefaultSqlGenerator;
    assert_eq!(g.exists_by_pk(&users()), "SELECT 1 FROM users WHERE id = ?");
    assert_eq!(g.count(&users()), "SELECT count(*) FROM users");
    assert_eq!(
        g.count_where(&users(), "last_name = ?"),
        "SELECT count(*) FROM users WHERE last_name = ?"
    );
}

#[test]
fn insert_variants() {
    let g = DefaultSqlGenerator;
    assert_eq!(
        g.insert(&users(), true),
        "INSERT INTO users (first_name, last_name) VALUES (?, ?)"
    );
    assert_eq!(
        g.insert(&users(), false),
        "INSERT INTO users (id, first_name, last_name) VALUES (?, ?, ?)"
    );

    let only_key = TableDescription::new("tags", vec![], vec!["id".to_string()]);
    assert_eq!(g.insert(&only_key, true), "INSERT INTO tags DEFAULT VALUES");
}

#[test]
fn update_binds_key_last() {
    assert_eq!(
        DefaultSqlGenerator.update(&users()),
        "UPDATE users SET first_name = ?, last_name = ? WHERE id = ?"
    );
}

#[test]
fn delete_by_pk() {
    assert_eq!(
        DefaultSqlGenerator.delete_by_pk(&users()),
        "DELETE FROM users WHERE id = ?"
    );
}

#[test]
fn sorted_select() {
    let sort = Sort::asc("last_name").and(rquery_repo::Order::desc("id"));
    assert_eq!(
        DefaultSqlGenerator.select_all_sorted(&users(), &sort),
        "SELECT id, first_name, last_name FROM users ORDER BY last_name ASC, id DESC"
    );
    assert_eq!(
        DefaultSqlGenerator.select_all_sorted(&users(), &Sort::unsorted()),
        "SELECT id, first_name, last_name FROM users"
    );
}

#[test]
fn where_sorted_select() {
    assert_eq!(
        DefaultSqlGenerator.select_all_where_sorted(&users(), "id > ?", &Sort::desc("id")),
        "SELECT id, first_name, last_name FROM users WHERE id > ? ORDER BY id DESC"
    );
}

#[test]
fn fallback_pages_with_row_number() {
    let sql = DefaultSqlGenerator.select_page(&users(), &Pageable::at_offset(10, 5));
    assert!(sql.contains("row_number() OVER (ORDER BY id ASC) AS rn__"));
    assert!(sql.contains("( SELECT id, first_name, last_name FROM users ) t1__"));
    assert!(sql.ends_with("WHERE t2__.rn__ BETWEEN 11 AND 15 ORDER BY t2__.rn__"));
}

#[test]
fn limit_offset_page() {
    let page = Pageable::at_offset(20, 10).sorted(Sort::asc("last_name"));
    assert_eq!(
        LimitOffsetSqlGenerator.select_page(&users(), &page),
        "SELECT id, first_name, last_name FROM users ORDER BY last_name ASC LIMIT 10 OFFSET 20"
    );
    assert_eq!(
        LimitOffsetSqlGenerator.select_page_where(&users(), "id > ?", &Pageable::of(0, 5)),
        "SELECT id, first_name, last_name FROM users WHERE id > ? LIMIT 5 OFFSET 0"
    );
}

#[test]
fn sql2008_page_orders_by_key_when_unsorted() {
    assert_eq!(
        Sql2008SqlGenerator.select_page(&users(), &Pageable::of(2, 10)),
        "SELECT id, first_name, last_name FROM users ORDER BY id ASC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
    );
    let sorted = Pageable::of(0, 3).sorted(Sort::desc("last_name"));
    assert_eq!(
        Sql2008SqlGenerator.select_page(&users(), &sorted),
        "SELECT id, first_name, last_name FROM users ORDER BY last_name DESC OFFSET 0 ROWS FETCH NEXT 3 ROWS ONLY"
    );
}

#[test]
fn oracle9_page_wraps_twice() {
    let sql = Oracle9SqlGenerator.select_page(&users(), &Pageable::at_offset(3, 3));
    assert_eq!(
        sql,
        "SELECT t2__.* FROM ( \
         SELECT t1__.*, ROWNUM AS rn__ FROM ( SELECT id, first_name, last_name FROM users ORDER BY id ASC ) t1__ \
         ) t2__ WHERE t2__.rn__ > 3 AND t2__.rn__ <= 6 ORDER BY t2__.rn__"
    );
}

#[test]
fn oracle9_filtered_page() {
    let sql = Oracle9SqlGenerator.select_page_where(&users(), "last_name = ?", &Pageable::of(1, 2));
    assert!(sql.contains("FROM users WHERE last_name = ? ORDER BY id ASC"));
    assert!(sql.contains("t2__.rn__ > 2 AND t2__.rn__ <= 4"));
}

#[test]
fn custom_clauses_are_used() {
    let table = users()
        .with_from_clause("users u JOIN teams t ON t.id = u.team_id")
        .with_select_clause("u.id, u.first_name, t.name");
    let g = DefaultSqlGenerator;
    assert_eq!(
        g.select_all(&table),
        "SELECT u.id, u.first_name, t.name FROM users u JOIN teams t ON t.id = u.team_id"
    );
    // writes always target the bare table
    assert_eq!(g.delete_by_pk(&table), "DELETE FROM users WHERE id = ?");
}
