use std::sync::Arc;

use crate::builder::Builder;
use crate::config::{BuilderConfig, ModelDescriptor};
use crate::dialect::Dialect;
use crate::error::Error;
use crate::executor::test_support::RecordingExecutor;
use crate::executor::Executor;
use crate::ident::ColumnRef;
use crate::operand::{subquery, IntoAssignments, IntoSetValue};
use crate::row::Row;
use crate::statement::RawFragment;
use crate::value::Value;

fn db() -> Builder {
    Builder::new(Arc::new(RecordingExecutor::new()) as Arc<dyn Executor>)
}

fn db_with_exec() -> (Arc<RecordingExecutor>, Builder) {
    let exec = Arc::new(RecordingExecutor::new());
    let builder = Builder::new(exec.clone() as Arc<dyn Executor>);
    (exec, builder)
}

fn db_pg() -> Builder {
    let exec = Arc::new(RecordingExecutor {
        dialect: Dialect::Postgres,
        ..Default::default()
    });
    Builder::new(exec as Arc<dyn Executor>)
}

// ==================== end-to-end compile shapes ====================

#[test]
fn where_eq_literal() {
    let stmt = db().table("users").where_eq("id", 1).compile().unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM `users` WHERE `id` = ?");
    assert_eq!(stmt.args, vec![Value::Int(1)]);
}

#[test]
fn where_in_list() {
    let stmt = db()
        .table("users")
        .where_in("id", vec![1i64, 2, 3])
        .compile()
        .unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM `users` WHERE `id` IN (?,?,?)");
    assert_eq!(
        stmt.args,
        vec![Value::Int(1), Value::Int(2), Value::Int(3)]
    );
}

#[test]
fn or_where_combinator() {
    let stmt = db()
        .table("users")
        .where_eq("status", 1)
        .or_where_eq("id", 1)
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `users` WHERE `status` = ? OR `id` = ?"
    );
    assert_eq!(stmt.args, vec![Value::Int(1), Value::Int(1)]);
}

#[test]
fn where_null_has_no_args() {
    let stmt = db().table("users").where_null("id").compile().unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM `users` WHERE `id` IS NULL");
    assert!(stmt.args.is_empty());
}

#[test]
fn where_eq_none_becomes_is_null() {
    let stmt = db()
        .table("users")
        .where_eq("deleted_at", Option::<i64>::None)
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `users` WHERE `deleted_at` IS NULL"
    );
}

#[test]
fn where_eq_list_becomes_in() {
    let stmt = db()
        .table("users")
        .where_eq("id", vec![1i64, 2])
        .compile()
        .unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM `users` WHERE `id` IN (?,?)");
}

#[test]
fn nested_builder_in_where_value() {
    let base = db();
    let sub = base.table("b").select(&["id"]).where_eq("x", 1);
    let stmt = base.table("a").where_eq("id", sub).compile().unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `a` WHERE `id` = (SELECT `id` FROM `b` WHERE `x` = ?)"
    );
    assert_eq!(stmt.args, vec![Value::Int(1)]);
}

#[test]
fn deferred_callback_subquery() {
    let stmt = db()
        .table("a")
        .where_eq(
            "id",
            subquery(|q| q.table("b").select(&["id"]).where_eq("x", 1)),
        )
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `a` WHERE `id` = (SELECT `id` FROM `b` WHERE `x` = ?)"
    );
    assert_eq!(stmt.args, vec![Value::Int(1)]);
}

// ==================== argument ordering ====================

#[test]
fn subquery_args_follow_emission_order() {
    let base = db();
    let sub_a = base.table("t1").select(&["x"]).where_eq("p", 10);
    let sub_b = base.table("t2").select(&["y"]).where_eq("q", 20);
    let stmt = base
        .table("main")
        .select_subquery(sub_a, "a")
        .where_eq("col", sub_b)
        .where_eq("z", 9)
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT (SELECT `x` FROM `t1` WHERE `p` = ?) AS `a` FROM `main` \
         WHERE `col` = (SELECT `y` FROM `t2` WHERE `q` = ?) AND `z` = ?"
    );
    // SELECT-position args precede WHERE-position args precede the literal.
    assert_eq!(
        stmt.args,
        vec![Value::Int(10), Value::Int(20), Value::Int(9)]
    );
}

#[test]
fn placeholder_count_matches_args() {
    let stmt = db()
        .table("users")
        .select_expr(RawFragment::with_args("GREATEST(?, ?) AS g", vec![
            Value::Int(1),
            Value::Int(2),
        ]))
        .where_eq("status", "active")
        .where_between("age", 18, 65)
        .where_in("role", vec!["admin", "user"])
        .compile()
        .unwrap();
    assert_eq!(stmt.placeholder_count(), stmt.args.len());
}

#[test]
fn compile_is_idempotent() {
    let q = db()
        .table("users")
        .select(&["id", "name"])
        .where_eq("status", 1)
        .where_in("role", vec![1i64, 2])
        .order_by_desc("created_at")
        .limit(10);
    let first = q.compile().unwrap();
    let second = q.compile().unwrap();
    assert_eq!(first, second);
}

// ==================== negation ====================

#[test]
fn where_not_null_value_is_not_null() {
    let stmt = db()
        .table("users")
        .where_not("id", Option::<i64>::None)
        .compile()
        .unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM `users` WHERE `id` IS NOT NULL");
}

#[test]
fn where_not_in_preserves_values() {
    let stmt = db()
        .table("users")
        .where_not_in("id", vec![1i64, 2, 3])
        .compile()
        .unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM `users` WHERE `id` NOT IN (?,?,?)");
    assert_eq!(
        stmt.args,
        vec![Value::Int(1), Value::Int(2), Value::Int(3)]
    );
}

#[test]
fn where_not_between() {
    let stmt = db()
        .table("users")
        .where_not_between("age", 18, 65)
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `users` WHERE `age` NOT BETWEEN ? AND ?"
    );
}

#[test]
fn where_group_not_wraps_whole_group() {
    let stmt = db()
        .table("users")
        .where_group_not(|g| g.where_eq("a", 1).or_where_eq("b", 2))
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `users` WHERE NOT (`a` = ? OR `b` = ?)"
    );
}

#[test]
fn or_where_raw_not_renders_or_and_not() {
    let stmt = db()
        .table("users")
        .where_eq("status", 1)
        .or_where_raw_not("price < ?", vec![Value::Int(100)])
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `users` WHERE `status` = ? OR NOT (price < ?)"
    );
}

// ==================== grouping ====================

#[test]
fn where_group_is_parenthesized() {
    let stmt = db()
        .table("users")
        .where_eq("status", 1)
        .where_group(|g| g.where_eq("a", 1).or_where_eq("b", 2))
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `users` WHERE `status` = ? AND (`a` = ? OR `b` = ?)"
    );
}

#[test]
fn single_condition_group_is_not_parenthesized() {
    let stmt = db()
        .table("users")
        .where_group(|g| g.where_eq("a", 1))
        .compile()
        .unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM `users` WHERE `a` = ?");
}

// ==================== joins, grouping, ordering ====================

#[test]
fn inner_join_renders_on_tree() {
    let stmt = db()
        .table("users u")
        .join("orders o", "u.id", "=", "o.user_id")
        .where_eq("u.status", 1)
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `users` AS `u` INNER JOIN `orders` AS `o` \
         ON `u`.`id` = `o`.`user_id` WHERE `u`.`status` = ?"
    );
}

#[test]
fn joins_render_in_insertion_order() {
    let stmt = db()
        .table("a")
        .left_join("b", "a.id", "=", "b.a_id")
        .join("c", "a.id", "=", "c.a_id")
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `a` LEFT JOIN `b` ON `a`.`id` = `b`.`a_id` \
         INNER JOIN `c` ON `a`.`id` = `c`.`a_id`"
    );
}

#[test]
fn group_by_and_having() {
    let stmt = db()
        .table("orders")
        .select(&["user_id"])
        .select_raw("COUNT(*) AS order_count")
        .group_by("user_id")
        .having_cmp(ColumnRef::raw("COUNT(*)"), ">", 5i64)
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT `user_id`, COUNT(*) AS order_count FROM `orders` \
         GROUP BY `user_id` HAVING COUNT(*) > ?"
    );
}

#[test]
fn or_having_not_renders_or_and_not() {
    let stmt = db()
        .table("orders")
        .group_by("user_id")
        .having_cmp(ColumnRef::raw("COUNT(*)"), ">", 5i64)
        .or_having_not("status", 1)
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `orders` GROUP BY `user_id` \
         HAVING COUNT(*) > ? OR NOT (`status` = ?)"
    );
}

#[test]
fn order_limit_offset_distinct() {
    let stmt = db()
        .table("users")
        .distinct()
        .order_by("name")
        .order_by_desc("created_at")
        .limit(10)
        .offset(20)
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT DISTINCT * FROM `users` ORDER BY `name` ASC, `created_at` DESC \
         LIMIT 10 OFFSET 20"
    );
}

#[test]
fn paginate_sets_limit_and_offset() {
    let stmt = db().table("users").paginate(3, 25).compile().unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM `users` LIMIT 25 OFFSET 50");
}

#[test]
fn hint_renders_after_select() {
    let stmt = db()
        .table("users")
        .hint("MAX_EXECUTION_TIME(1000)")
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT /*+ MAX_EXECUTION_TIME(1000) */ * FROM `users`"
    );
}

// ==================== subquery tables ====================

#[test]
fn from_subquery_requires_alias() {
    let base = db();
    let sub = base.table("users").select(&["id"]);
    let err = base.from_subquery(sub, "").compile().unwrap_err();
    assert!(matches!(err, Error::EmptySubqueryAlias));
}

#[test]
fn from_subquery_with_alias() {
    let base = db();
    let sub = base.table("users").select(&["id"]).where_eq("x", 1);
    let stmt = base
        .from_subquery(sub, "u")
        .where_eq("id", 2)
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM (SELECT `id` FROM `users` WHERE `x` = ?) AS `u` WHERE `id` = ?"
    );
    assert_eq!(stmt.args, vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn where_in_subquery() {
    let base = db();
    let sub = base.table("banned").select(&["user_id"]);
    let stmt = base.table("users").where_in("id", sub).compile().unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `users` WHERE `id` IN (SELECT `user_id` FROM `banned`)"
    );
}

#[test]
fn where_exists_subquery() {
    let stmt = db()
        .table("users")
        .where_exists(subquery(|q| {
            q.table("orders")
                .select_raw("1")
                .where_raw("orders.user_id = users.id", vec![])
        }))
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `users` WHERE EXISTS \
         (SELECT 1 FROM `orders` WHERE orders.user_id = users.id)"
    );
}

// ==================== dialects ====================

#[test]
fn postgres_dialect_numbers_placeholders() {
    let stmt = db_pg()
        .table("users")
        .where_eq("id", 1)
        .where_cmp("age", ">", 18)
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE \"id\" = $1 AND \"age\" > $2"
    );
}

#[test]
fn postgres_subquery_numbering_spans_statements() {
    let base = db_pg();
    let sub = base.table("b").select(&["id"]).where_eq("x", 1);
    let stmt = base
        .table("a")
        .where_eq("id", sub)
        .where_eq("y", 2)
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"a\" WHERE \"id\" = (SELECT \"id\" FROM \"b\" WHERE \"x\" = $1) AND \"y\" = $2"
    );
    assert_eq!(stmt.args, vec![Value::Int(1), Value::Int(2)]);
}

// ==================== programmer errors ====================

#[test]
fn unknown_operator_is_invalid_argument() {
    let err = db()
        .table("users")
        .where_cmp("id", "~~", 1)
        .compile()
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn first_build_error_wins() {
    let err = db()
        .table("users")
        .where_cmp("id", "~~", 1)
        .where_cmp("id", "!!", 2)
        .compile()
        .unwrap_err();
    match err {
        Error::InvalidArgument { message, .. } => assert!(message.contains("~~")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_table_is_an_error() {
    let base = db();
    let err = base.clone().where_eq("id", 1).compile().unwrap_err();
    assert!(matches!(err, Error::MissingTable));
}

#[test]
fn model_descriptor_supplies_implicit_table() {
    let exec = Arc::new(RecordingExecutor::new()) as Arc<dyn Executor>;
    let config = BuilderConfig::new(Dialect::MySql)
        .with_model(ModelDescriptor::new("users", "user_id"));
    let base = Builder::with_config(exec, config);
    let stmt = base.clone().where_eq("active", true).compile().unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM `users` WHERE `active` = ?");
}

// ==================== mutations ====================

#[test]
fn insert_compiles_columns_and_placeholders() {
    let q = db().table("users");
    let stmt = q
        .compile_insert(&[vec![("username", "alice"), ("email", "a@example.com")]
            .into_assignments()])
        .unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO `users` (`username`, `email`) VALUES (?, ?)"
    );
    assert_eq!(
        stmt.args,
        vec![
            Value::Text("alice".into()),
            Value::Text("a@example.com".into())
        ]
    );
}

#[test]
fn insert_raw_set_value() {
    let q = db().table("users");
    let stmt = q
        .compile_insert(&[vec![
            ("username".to_string(), "alice".into_set_value()),
            ("created_at".to_string(), RawFragment::new("NOW()").into_set_value()),
        ]])
        .unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO `users` (`username`, `created_at`) VALUES (?, NOW())"
    );
    assert_eq!(stmt.args, vec![Value::Text("alice".into())]);
}

#[test]
fn insert_many_rows() {
    let q = db().table("users");
    let stmt = q
        .compile_insert(&[
            vec![("name", "a")].into_assignments(),
            vec![("name", "b")].into_assignments(),
        ])
        .unwrap();
    assert_eq!(stmt.sql, "INSERT INTO `users` (`name`) VALUES (?), (?)");
}

#[test]
fn insert_mismatched_rows_is_invalid() {
    let q = db().table("users");
    let err = q
        .compile_insert(&[
            vec![("name", "a")].into_assignments(),
            vec![("email", "b")].into_assignments(),
        ])
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn update_args_precede_where_args() {
    let q = db().table("users").where_eq("id", 7);
    let stmt = q
        .compile_update(vec![("name", "bob"), ("status", "active")].into_assignments())
        .unwrap();
    assert_eq!(
        stmt.sql,
        "UPDATE `users` SET `name` = ?, `status` = ? WHERE `id` = ?"
    );
    assert_eq!(
        stmt.args,
        vec![
            Value::Text("bob".into()),
            Value::Text("active".into()),
            Value::Int(7)
        ]
    );
}

#[test]
fn unguarded_update_is_refused() {
    let q = db().table("users");
    let err = q
        .compile_update(vec![("name", "bob")].into_assignments())
        .unwrap_err();
    assert!(matches!(err, Error::UnguardedMutation { verb: "UPDATE" }));
}

#[test]
fn unguarded_delete_requires_opt_in() {
    let guarded = db().table("users");
    assert!(matches!(
        guarded.compile_delete().unwrap_err(),
        Error::UnguardedMutation { verb: "DELETE" }
    ));

    let allowed = db().table("users").allow_unguarded();
    let stmt = allowed.compile_delete().unwrap();
    assert_eq!(stmt.sql, "DELETE FROM `users`");
}

#[test]
fn delete_with_where() {
    let q = db().table("users").where_eq("id", 1);
    let stmt = q.compile_delete().unwrap();
    assert_eq!(stmt.sql, "DELETE FROM `users` WHERE `id` = ?");
}

#[test]
fn upsert_mysql_uses_duplicate_key() {
    let q = db().table("users");
    let stmt = q
        .compile_upsert(
            vec![("email", "a@example.com"), ("name", "alice")].into_assignments(),
            &["email"],
            None,
        )
        .unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO `users` (`email`, `name`) VALUES (?, ?) \
         ON DUPLICATE KEY UPDATE `name` = VALUES(`name`)"
    );
}

#[test]
fn upsert_postgres_uses_on_conflict() {
    let q = db_pg().table("users");
    let stmt = q
        .compile_upsert(
            vec![("email", "a@example.com"), ("name", "alice")].into_assignments(),
            &["email"],
            Some(&["name"]),
        )
        .unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO \"users\" (\"email\", \"name\") VALUES ($1, $2) \
         ON CONFLICT (\"email\") DO UPDATE SET \"name\" = EXCLUDED.\"name\""
    );
}

#[test]
fn upsert_requires_conflict_keys() {
    let q = db().table("users");
    let err = q
        .compile_upsert(vec![("name", "alice")].into_assignments(), &[], None)
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

// ==================== verbs against the recording executor ====================

#[tokio::test]
async fn find_dispatches_compiled_statement() {
    let (exec, base) = db_with_exec();
    exec.queue_result(vec![Row::from_pairs(vec![(
        "id".to_string(),
        Value::Int(1),
    )])]);
    let rows = base.table("users").where_eq("id", 1).find().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        exec.statements(),
        vec!["SELECT * FROM `users` WHERE `id` = ?"]
    );
    assert_eq!(exec.last_args(), vec![Value::Int(1)]);
}

#[tokio::test]
async fn first_injects_pk_order_and_limit() {
    let (exec, base) = db_with_exec();
    let _ = base.table("users").first().await.unwrap();
    assert_eq!(
        exec.statements(),
        vec!["SELECT * FROM `users` ORDER BY `id` ASC LIMIT 1"]
    );
}

#[tokio::test]
async fn last_injects_descending_pk_order() {
    let (exec, base) = db_with_exec();
    let _ = base.table("users").last().await.unwrap();
    assert_eq!(
        exec.statements(),
        vec!["SELECT * FROM `users` ORDER BY `id` DESC LIMIT 1"]
    );
}

#[tokio::test]
async fn first_keeps_explicit_order() {
    let (exec, base) = db_with_exec();
    let _ = base
        .table("users")
        .order_by_desc("created_at")
        .first()
        .await
        .unwrap();
    assert_eq!(
        exec.statements(),
        vec!["SELECT * FROM `users` ORDER BY `created_at` DESC LIMIT 1"]
    );
}

#[tokio::test]
async fn model_descriptor_primary_key_drives_first() {
    let exec = Arc::new(RecordingExecutor::new());
    let config = BuilderConfig::new(Dialect::MySql)
        .with_model(ModelDescriptor::new("users", "user_id"));
    let base = Builder::with_config(exec.clone() as Arc<dyn Executor>, config);
    let _ = base.clone().first().await.unwrap();
    assert_eq!(
        exec.statements(),
        vec!["SELECT * FROM `users` ORDER BY `user_id` ASC LIMIT 1"]
    );
}

#[tokio::test]
async fn count_clears_select_order_and_limit() {
    let (exec, base) = db_with_exec();
    exec.queue_result(vec![Row::from_pairs(vec![(
        "count".to_string(),
        Value::Int(42),
    )])]);
    let n = base
        .table("users")
        .select(&["id", "name"])
        .where_eq("status", 1)
        .order_by("name")
        .limit(5)
        .count()
        .await
        .unwrap();
    assert_eq!(n, 42);
    assert_eq!(
        exec.statements(),
        vec!["SELECT COUNT(*) FROM `users` WHERE `status` = ?"]
    );
}

#[tokio::test]
async fn count_wraps_grouped_queries() {
    let (exec, base) = db_with_exec();
    exec.queue_result(vec![Row::from_pairs(vec![(
        "count".to_string(),
        Value::Int(3),
    )])]);
    let _ = base
        .table("orders")
        .group_by("user_id")
        .count()
        .await
        .unwrap();
    assert_eq!(
        exec.statements(),
        vec!["SELECT COUNT(*) FROM (SELECT 1 FROM `orders` GROUP BY `user_id`) AS `t`"]
    );
}

#[tokio::test]
async fn aggregates_return_null_on_empty() {
    let (exec, base) = db_with_exec();
    exec.queue_result(vec![]);
    let total = base.table("orders").sum("amount").await.unwrap();
    assert_eq!(total, Value::Null);
    assert_eq!(
        exec.statements(),
        vec!["SELECT SUM(`amount`) FROM `orders`"]
    );
}

#[tokio::test]
async fn pluck_selects_single_column() {
    let (exec, base) = db_with_exec();
    exec.queue_result(vec![
        Row::from_pairs(vec![("name".to_string(), Value::Text("a".into()))]),
        Row::from_pairs(vec![("name".to_string(), Value::Text("b".into()))]),
    ]);
    let names = base.table("users").pluck("name").await.unwrap();
    assert_eq!(
        names,
        vec![Value::Text("a".into()), Value::Text("b".into())]
    );
    assert_eq!(exec.statements(), vec!["SELECT `name` FROM `users`"]);
}

#[tokio::test]
async fn terminal_verb_consumes_builder() {
    let (_exec, base) = db_with_exec();
    let mut q = base.table("users");
    let _ = q.find().await.unwrap();
    let err = q.find().await.unwrap_err();
    assert!(matches!(err, Error::BuilderConsumed));
}

#[tokio::test]
async fn mutation_after_terminal_verb_is_deferred_error() {
    let (_exec, base) = db_with_exec();
    let mut q = base.table("users");
    let _ = q.find().await.unwrap();
    let err = q.where_eq("id", 1).compile().unwrap_err();
    assert!(matches!(err, Error::BuilderConsumed));
}

#[tokio::test]
async fn first_or_create_inserts_when_missing() {
    let (exec, base) = db_with_exec();
    // First lookup: no rows; post-insert lookup: the created row.
    exec.queue_result(vec![]);
    exec.queue_result(vec![Row::from_pairs(vec![(
        "id".to_string(),
        Value::Int(1),
    )])]);
    let row = base
        .table("users")
        .first_or_create(vec![("email", "a@example.com")])
        .await
        .unwrap();
    assert_eq!(row.get("id"), Some(&Value::Int(1)));
    let stmts = exec.statements();
    assert_eq!(stmts.len(), 3);
    assert_eq!(
        stmts[0],
        "SELECT * FROM `users` WHERE `email` = ? ORDER BY `id` ASC LIMIT 1"
    );
    assert_eq!(stmts[1], "INSERT INTO `users` (`email`) VALUES (?)");
    assert_eq!(stmts[2], stmts[0]);
}

#[tokio::test]
async fn first_or_create_returns_existing_row() {
    let (exec, base) = db_with_exec();
    exec.queue_result(vec![Row::from_pairs(vec![(
        "id".to_string(),
        Value::Int(9),
    )])]);
    let row = base
        .table("users")
        .first_or_create(vec![("email", "a@example.com")])
        .await
        .unwrap();
    assert_eq!(row.get("id"), Some(&Value::Int(9)));
    assert_eq!(exec.statements().len(), 1);
}

#[tokio::test]
async fn raw_verbs_bypass_the_assembler() {
    let (exec, base) = db_with_exec();
    let affected = base
        .execute_raw("UPDATE counters SET n = n + 1 WHERE id = ?", vec![Value::Int(1)])
        .await
        .unwrap();
    assert_eq!(affected, 1);
    exec.queue_result(vec![]);
    let _ = base.fetch_raw("SELECT 1", vec![]).await.unwrap();
    assert_eq!(
        exec.statements(),
        vec![
            "UPDATE counters SET n = n + 1 WHERE id = ?",
            "SELECT 1"
        ]
    );
}

#[test]
fn where_like_and_negation() {
    let stmt = db()
        .table("users")
        .where_like("name", "a%")
        .where_not_like("email", "%spam%")
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `users` WHERE `name` LIKE ? AND `email` NOT LIKE ?"
    );
}

#[test]
fn or_where_group_renders_or_before_parens() {
    let stmt = db()
        .table("users")
        .where_eq("status", 1)
        .or_where_group(|g| g.where_eq("a", 1).where_eq("b", 2))
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `users` WHERE `status` = ? OR (`a` = ? AND `b` = ?)"
    );
}

#[test]
fn join_subquery_is_aliased() {
    let base = db();
    let totals = base
        .table("orders")
        .select(&["user_id"])
        .group_by("user_id");
    let stmt = base
        .table("users")
        .join_subquery(totals, "o", "users.id", "=", "o.user_id")
        .compile()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `users` INNER JOIN \
         (SELECT `user_id` FROM `orders` GROUP BY `user_id`) AS `o` \
         ON `users`.`id` = `o`.`user_id`"
    );
}

#[tokio::test]
async fn value_fetches_single_column_of_first_row() {
    let (exec, base) = db_with_exec();
    exec.queue_result(vec![Row::from_pairs(vec![(
        "email".to_string(),
        Value::Text("a@example.com".into()),
    )])]);
    let email = base
        .table("users")
        .where_eq("id", 1)
        .value("email")
        .await
        .unwrap();
    assert_eq!(email, Some(Value::Text("a@example.com".into())));
    assert_eq!(
        exec.statements(),
        vec!["SELECT `email` FROM `users` WHERE `id` = ? ORDER BY `id` ASC LIMIT 1"]
    );
}

#[tokio::test]
async fn exists_row_limits_to_one() {
    let (exec, base) = db_with_exec();
    exec.queue_result(vec![Row::from_pairs(vec![(
        "1".to_string(),
        Value::Int(1),
    )])]);
    let found = base
        .table("users")
        .where_eq("id", 1)
        .exists_row()
        .await
        .unwrap();
    assert!(found);
    assert_eq!(
        exec.statements(),
        vec!["SELECT 1 FROM `users` WHERE `id` = ? LIMIT 1"]
    );
}

#[tokio::test]
async fn execution_errors_propagate_unchanged() {
    let (exec, base) = db_with_exec();
    exec.fail_on("SELECT");
    let err = base.table("users").find().await.unwrap_err();
    assert!(matches!(err, Error::Execution(_)));
}
