//! tokio-postgres backed executor.
//!
//! [`PgExecutor`] adapts a `tokio_postgres::Client` to the [`Executor`]
//! capability: [`Value`] arguments delegate to the driver's `ToSql`
//! machinery per variant, result columns decode into [`Value`] by column
//! type, and the transaction verbs are issued as plain statements so the
//! builder's depth bookkeeping stays in charge.

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::row::Row;
use crate::value::Value;

type BoxedSqlError = Box<dyn std::error::Error + Sync + Send>;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxedSqlError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::Int(v) => {
                // Coerce to whatever integer width the statement inferred.
                if *ty == Type::INT2 {
                    (*v as i16).to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    (*v as i32).to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*v as f64).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Float(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Text(v) => v.as_str().to_sql(ty, out),
            Value::Bytes(v) => v.as_slice().to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::DateTime(v) => {
                if *ty == Type::TIMESTAMP {
                    v.naive_utc().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Json(v) => v.to_sql(ty, out),
            Value::List(_) => Err("list arguments must be expanded by the builder".into()),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn decode_column(row: &tokio_postgres::Row, idx: usize) -> Result<Value> {
    let column = &row.columns()[idx];
    let name = column.name();
    let ty = column.type_();
    let decode_err = |e: tokio_postgres::Error| Error::decode(name, e.to_string());

    macro_rules! get {
        ($t:ty, $wrap:expr) => {
            row.try_get::<_, Option<$t>>(idx)
                .map_err(decode_err)?
                .map($wrap)
                .unwrap_or(Value::Null)
        };
    }

    let value = if *ty == Type::BOOL {
        get!(bool, Value::Bool)
    } else if *ty == Type::INT2 {
        get!(i16, |v| Value::Int(v as i64))
    } else if *ty == Type::INT4 {
        get!(i32, |v| Value::Int(v as i64))
    } else if *ty == Type::INT8 {
        get!(i64, Value::Int)
    } else if *ty == Type::FLOAT4 {
        get!(f32, |v| Value::Float(v as f64))
    } else if *ty == Type::FLOAT8 {
        get!(f64, Value::Float)
    } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
    {
        get!(String, Value::Text)
    } else if *ty == Type::BYTEA {
        get!(Vec<u8>, Value::Bytes)
    } else if *ty == Type::UUID {
        get!(uuid::Uuid, Value::Uuid)
    } else if *ty == Type::TIMESTAMPTZ {
        get!(DateTime<Utc>, Value::DateTime)
    } else if *ty == Type::TIMESTAMP {
        get!(NaiveDateTime, |v| Value::DateTime(
            DateTime::from_naive_utc_and_offset(v, Utc)
        ))
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        get!(serde_json::Value, Value::Json)
    } else {
        return Err(Error::decode(name, format!("unsupported column type {ty}")));
    };
    Ok(value)
}

fn decode_row(row: &tokio_postgres::Row) -> Result<Row> {
    let columns: Vec<String> = row
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let mut values = Vec::with_capacity(columns.len());
    for idx in 0..columns.len() {
        values.push(decode_column(row, idx)?);
    }
    Ok(Row::new(columns.into(), values))
}

/// An [`Executor`] over a direct `tokio_postgres::Client` connection.
pub struct PgExecutor {
    client: tokio_postgres::Client,
}

impl PgExecutor {
    pub fn new(client: tokio_postgres::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }

    pub fn into_client(self) -> tokio_postgres::Client {
        self.client
    }

    fn params(args: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
        args.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
    }
}

#[async_trait]
impl Executor for PgExecutor {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>> {
        let params = Self::params(args);
        let rows = self.client.query(sql, &params).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64> {
        let params = Self::params(args);
        Ok(self.client.execute(sql, &params).await?)
    }

    async fn begin(&self) -> Result<()> {
        Ok(self.client.batch_execute("BEGIN").await?)
    }

    async fn commit(&self) -> Result<()> {
        Ok(self.client.batch_execute("COMMIT").await?)
    }

    async fn rollback(&self) -> Result<()> {
        Ok(self.client.batch_execute("ROLLBACK").await?)
    }

    async fn savepoint(&self, name: &str) -> Result<()> {
        let quoted = Dialect::Postgres.quote_identifier(name);
        Ok(self.client.batch_execute(&format!("SAVEPOINT {quoted}")).await?)
    }

    async fn release_savepoint(&self, name: &str) -> Result<()> {
        let quoted = Dialect::Postgres.quote_identifier(name);
        Ok(self
            .client
            .batch_execute(&format!("RELEASE SAVEPOINT {quoted}"))
            .await?)
    }

    async fn rollback_to_savepoint(&self, name: &str) -> Result<()> {
        let quoted = Dialect::Postgres.quote_identifier(name);
        Ok(self
            .client
            .batch_execute(&format!("ROLLBACK TO SAVEPOINT {quoted}"))
            .await?)
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }
}
