//! Append-only event log plus the derived `orders` projection, grounded on
//! the teacher's `db/mod.rs` (raw `sqlx::query` + manual row mapping,
//! `CREATE TABLE IF NOT EXISTS`, explicit indexes).

mod codec;

use crate::error::EngineError;
use crate::model::{Account, CopyRule, ExecType, Order, OrderEvent, OrderStatus, Route};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    pub async fn connect(database_url: &str) -> Result<Self, EngineError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS order_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                execution_id TEXT NOT NULL,
                exec_type TEXT NOT NULL,
                order_status TEXT NOT NULL,
                cl_ord_id TEXT NOT NULL,
                orig_cl_ord_id TEXT,
                venue_order_id TEXT,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                ord_type TEXT,
                time_in_force TEXT,
                order_qty TEXT NOT NULL,
                last_qty TEXT,
                cum_qty TEXT,
                leaves_qty TEXT,
                price TEXT,
                stop_px TEXT,
                last_px TEXT,
                avg_px TEXT,
                account TEXT NOT NULL,
                ex_destination TEXT,
                quote_req_id TEXT,
                transact_time TEXT,
                text TEXT,
                ingested_at TEXT NOT NULL,
                raw BLOB NOT NULL,
                UNIQUE(session_id, execution_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                account TEXT NOT NULL,
                cl_ord_id TEXT NOT NULL,
                order_status TEXT NOT NULL,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                ord_type TEXT,
                time_in_force TEXT,
                order_qty TEXT NOT NULL,
                cum_qty TEXT NOT NULL,
                leaves_qty TEXT NOT NULL,
                price TEXT,
                avg_px TEXT,
                venue_order_id TEXT,
                primary_order_cl_ord_id TEXT,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (account, cl_ord_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_symbol ON orders(symbol)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_primary ON orders(primary_order_cl_ord_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_venue ON orders(venue_order_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY,
                account_number TEXT NOT NULL UNIQUE,
                broker TEXT NOT NULL,
                account_type TEXT NOT NULL,
                active INTEGER NOT NULL,
                strategy_key TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS routes (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                broker TEXT NOT NULL,
                priority INTEGER NOT NULL,
                active INTEGER NOT NULL,
                locate_type TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS copy_rules (
                id INTEGER PRIMARY KEY,
                primary_account TEXT NOT NULL,
                shadow_account TEXT NOT NULL,
                ratio_type TEXT NOT NULL,
                ratio_value TEXT NOT NULL,
                accepted_order_types TEXT,
                copy_route TEXT,
                locate_route TEXT,
                min_quantity TEXT,
                max_quantity TEXT,
                priority INTEGER NOT NULL,
                active INTEGER NOT NULL,
                config TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_copy_rules_primary ON copy_rules(primary_account)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Upserts the administrative tables from a seed set, keyed by natural
    /// key (`account_number` / route `name` / rule `id`). Used at startup to
    /// bring the database in line with the operator's seed file; later
    /// edits are expected to go directly against these tables, per §4.G's
    /// "refreshed on administrative change".
    pub async fn seed_catalog(
        &self,
        accounts: &[Account],
        routes: &[Route],
        rules: &[CopyRule],
    ) -> Result<(), EngineError> {
        for account in accounts {
            sqlx::query(
                r#"
                INSERT INTO accounts (id, account_number, broker, account_type, active, strategy_key)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(account_number) DO UPDATE SET
                    broker = excluded.broker, account_type = excluded.account_type,
                    active = excluded.active, strategy_key = excluded.strategy_key
                "#,
            )
            .bind(account.id)
            .bind(&account.account_number)
            .bind(&account.broker)
            .bind(codec::account_type_to_db(account.account_type))
            .bind(account.active)
            .bind(&account.strategy_key)
            .execute(&self.pool)
            .await?;
        }

        for route in routes {
            sqlx::query(
                r#"
                INSERT INTO routes (id, name, broker, priority, active, locate_type)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(name) DO UPDATE SET
                    broker = excluded.broker, priority = excluded.priority,
                    active = excluded.active, locate_type = excluded.locate_type
                "#,
            )
            .bind(route.id)
            .bind(&route.name)
            .bind(&route.broker)
            .bind(route.priority)
            .bind(route.active)
            .bind(codec::locate_type_to_db(route.locate_type))
            .execute(&self.pool)
            .await?;
        }

        for rule in rules {
            sqlx::query(
                r#"
                INSERT INTO copy_rules (
                    id, primary_account, shadow_account, ratio_type, ratio_value,
                    accepted_order_types, copy_route, locate_route, min_quantity,
                    max_quantity, priority, active, config
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    primary_account = excluded.primary_account, shadow_account = excluded.shadow_account,
                    ratio_type = excluded.ratio_type, ratio_value = excluded.ratio_value,
                    accepted_order_types = excluded.accepted_order_types, copy_route = excluded.copy_route,
                    locate_route = excluded.locate_route, min_quantity = excluded.min_quantity,
                    max_quantity = excluded.max_quantity, priority = excluded.priority,
                    active = excluded.active, config = excluded.config
                "#,
            )
            .bind(rule.id)
            .bind(&rule.primary_account)
            .bind(&rule.shadow_account)
            .bind(codec::ratio_type_to_db(rule.ratio_type))
            .bind(rule.ratio_value.to_string())
            .bind(codec::order_type_set_to_db(&rule.accepted_order_types))
            .bind(&rule.copy_route)
            .bind(&rule.locate_route)
            .bind(codec::decimal_to_db(rule.min_quantity))
            .bind(codec::decimal_to_db(rule.max_quantity))
            .bind(rule.priority)
            .bind(rule.active)
            .bind(rule.config.to_string())
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    pub async fn load_accounts(&self) -> Result<Vec<Account>, EngineError> {
        let rows = sqlx::query("SELECT * FROM accounts").fetch_all(&self.pool).await?;
        rows.iter().map(row_to_account).collect()
    }

    pub async fn load_routes(&self) -> Result<Vec<Route>, EngineError> {
        let rows = sqlx::query("SELECT * FROM routes").fetch_all(&self.pool).await?;
        rows.iter().map(row_to_route).collect()
    }

    pub async fn load_copy_rules(&self) -> Result<Vec<CopyRule>, EngineError> {
        let rows = sqlx::query("SELECT * FROM copy_rules").fetch_all(&self.pool).await?;
        rows.iter().map(row_to_copy_rule).collect()
    }

    /// Appends `event` and applies its projection update inside one
    /// transaction. Returns `false` without side effects if an event with
    /// the same `(session_id, execution_id)` already exists — this is the
    /// sole idempotency boundary the rest of the engine relies on.
    pub async fn append_event(
        &self,
        event: &OrderEvent,
        primary_order_cl_ord_id: Option<&str>,
    ) -> Result<bool, EngineError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM order_events WHERE session_id = ? AND execution_id = ?",
        )
        .bind(&event.session_id)
        .bind(&event.execution_id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO order_events (
                session_id, execution_id, exec_type, order_status, cl_ord_id, orig_cl_ord_id,
                venue_order_id, symbol, side, ord_type, time_in_force, order_qty, last_qty,
                cum_qty, leaves_qty, price, stop_px, last_px, avg_px, account, ex_destination,
                quote_req_id, transact_time, text, ingested_at, raw
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.session_id)
        .bind(&event.execution_id)
        .bind(codec::exec_type_to_db(event.exec_type))
        .bind(codec::order_status_to_db(event.order_status))
        .bind(&event.cl_ord_id)
        .bind(&event.orig_cl_ord_id)
        .bind(&event.venue_order_id)
        .bind(&event.symbol)
        .bind(&event.side)
        .bind(&event.ord_type)
        .bind(&event.time_in_force)
        .bind(event.order_qty.to_string())
        .bind(codec::decimal_to_db(event.last_qty))
        .bind(codec::decimal_to_db(event.cum_qty))
        .bind(codec::decimal_to_db(event.leaves_qty))
        .bind(codec::decimal_to_db(event.price))
        .bind(codec::decimal_to_db(event.stop_px))
        .bind(codec::decimal_to_db(event.last_px))
        .bind(codec::decimal_to_db(event.avg_px))
        .bind(&event.account)
        .bind(&event.ex_destination)
        .bind(&event.quote_req_id)
        .bind(event.transact_time.map(|t| t.to_rfc3339()))
        .bind(&event.text)
        .bind(event.ingested_at.to_rfc3339())
        .bind(&event.raw)
        .execute(&mut *tx)
        .await?;

        self.apply_projection(&mut tx, event, primary_order_cl_ord_id).await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn apply_projection(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        event: &OrderEvent,
        primary_order_cl_ord_id: Option<&str>,
    ) -> Result<(), EngineError> {
        if event.exec_type == ExecType::Replaced {
            if let Some(orig) = &event.orig_cl_ord_id {
                let inherited = sqlx::query_scalar::<_, Option<String>>(
                    "SELECT primary_order_cl_ord_id FROM orders WHERE account = ? AND cl_ord_id = ?",
                )
                .bind(&event.account)
                .bind(orig)
                .fetch_optional(&mut **tx)
                .await?
                .flatten();

                sqlx::query(
                    "UPDATE orders SET order_status = ?, updated_at = ? WHERE account = ? AND cl_ord_id = ?",
                )
                .bind(codec::order_status_to_db(OrderStatus::Replaced))
                .bind(event.ingested_at.to_rfc3339())
                .bind(&event.account)
                .bind(orig)
                .execute(&mut **tx)
                .await?;

                let inherited = inherited.or_else(|| primary_order_cl_ord_id.map(String::from));
                self.upsert_order_row(tx, event, inherited.as_deref()).await?;
                return Ok(());
            }
        }

        self.upsert_order_row(tx, event, primary_order_cl_ord_id).await
    }

    async fn upsert_order_row(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        event: &OrderEvent,
        primary_order_cl_ord_id: Option<&str>,
    ) -> Result<(), EngineError> {
        let prior = sqlx::query(
            "SELECT cum_qty, avg_px, primary_order_cl_ord_id, order_status FROM orders WHERE account = ? AND cl_ord_id = ?",
        )
        .bind(&event.account)
        .bind(&event.cl_ord_id)
        .fetch_optional(&mut **tx)
        .await?;

        let (prior_cum_qty, prior_avg_px, prior_primary): (
            rust_decimal::Decimal,
            Option<rust_decimal::Decimal>,
            Option<String>,
        ) = match &prior {
            Some(row) => (
                codec::decimal_from_db(row.try_get("cum_qty")?)?.unwrap_or_default(),
                codec::decimal_from_db(row.try_get("avg_px")?)?,
                row.try_get("primary_order_cl_ord_id")?,
            ),
            None => (rust_decimal::Decimal::ZERO, None, None),
        };

        let cum_qty = event
            .cum_qty
            .unwrap_or_else(|| prior_cum_qty + event.last_qty.unwrap_or_default());
        let leaves_qty = event.leaves_qty.unwrap_or(event.order_qty - cum_qty);
        let avg_px = event.avg_px.or(prior_avg_px);
        let primary_link = primary_order_cl_ord_id
            .map(String::from)
            .or(prior_primary);

        if prior.is_some() {
            let prior_status_str: String = prior.as_ref().unwrap().try_get("order_status")?;
            let prior_status = codec::order_status_from_db(&prior_status_str)?;
            if !prior_status.can_transition_to(event.order_status) {
                tracing::warn!(
                    account = %event.account,
                    cl_ord_id = %event.cl_ord_id,
                    from = ?prior_status,
                    to = ?event.order_status,
                    "order status transition is not in the legal state graph"
                );
            }
        }

        sqlx::query(
            r#"
            INSERT INTO orders (
                account, cl_ord_id, order_status, symbol, side, ord_type, time_in_force,
                order_qty, cum_qty, leaves_qty, price, avg_px, venue_order_id,
                primary_order_cl_ord_id, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(account, cl_ord_id) DO UPDATE SET
                order_status = excluded.order_status,
                cum_qty = excluded.cum_qty,
                leaves_qty = excluded.leaves_qty,
                price = excluded.price,
                avg_px = excluded.avg_px,
                venue_order_id = excluded.venue_order_id,
                primary_order_cl_ord_id = excluded.primary_order_cl_ord_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&event.account)
        .bind(&event.cl_ord_id)
        .bind(codec::order_status_to_db(event.order_status))
        .bind(&event.symbol)
        .bind(&event.side)
        .bind(&event.ord_type)
        .bind(&event.time_in_force)
        .bind(event.order_qty.to_string())
        .bind(cum_qty.to_string())
        .bind(leaves_qty.to_string())
        .bind(codec::decimal_to_db(event.price))
        .bind(codec::decimal_to_db(avg_px))
        .bind(&event.venue_order_id)
        .bind(&primary_link)
        .bind(event.ingested_at.to_rfc3339())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn get_order(&self, account: &str, cl_ord_id: &str) -> Result<Option<Order>, EngineError> {
        let row = sqlx::query("SELECT * FROM orders WHERE account = ? AND cl_ord_id = ?")
            .bind(account)
            .bind(cl_ord_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_order(&r)).transpose()
    }

    /// Live shadow orders linked back to `primary_cl_ord_id`, used to
    /// propagate a primary REPLACE/CANCEL to every child.
    pub async fn get_live_orders_by_primary(&self, primary_cl_ord_id: &str) -> Result<Vec<Order>, EngineError> {
        let rows = sqlx::query(
            "SELECT * FROM orders WHERE primary_order_cl_ord_id = ? AND order_status NOT IN ('CANCELED', 'FILLED', 'REJECTED', 'REPLACED')",
        )
        .bind(primary_cl_ord_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_order).collect()
    }

    pub async fn find_order_by_venue_id(&self, venue_order_id: &str) -> Result<Option<Order>, EngineError> {
        let row = sqlx::query("SELECT * FROM orders WHERE venue_order_id = ? LIMIT 1")
            .bind(venue_order_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_order(&r)).transpose()
    }

    /// Streaming read of events for one order, ordered by ingestion time.
    pub async fn events_for_order(&self, account: &str, cl_ord_id: &str) -> Result<Vec<OrderEvent>, EngineError> {
        let rows = sqlx::query(
            "SELECT * FROM order_events WHERE account = ? AND cl_ord_id = ? ORDER BY ingested_at ASC",
        )
        .bind(account)
        .bind(cl_ord_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_event).collect()
    }
}

fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Result<Order, EngineError> {
    Ok(Order {
        account: row.try_get("account")?,
        cl_ord_id: row.try_get("cl_ord_id")?,
        order_status: codec::order_status_from_db(row.try_get::<String, _>("order_status")?.as_str())?,
        symbol: row.try_get("symbol")?,
        side: row.try_get("side")?,
        ord_type: row.try_get("ord_type")?,
        time_in_force: row.try_get("time_in_force")?,
        order_qty: row.try_get::<String, _>("order_qty")?.parse().unwrap_or_default(),
        cum_qty: row.try_get::<String, _>("cum_qty")?.parse().unwrap_or_default(),
        leaves_qty: row.try_get::<String, _>("leaves_qty")?.parse().unwrap_or_default(),
        price: codec::decimal_from_db(row.try_get("price")?)?,
        avg_px: codec::decimal_from_db(row.try_get("avg_px")?)?,
        venue_order_id: row.try_get("venue_order_id")?,
        primary_order_cl_ord_id: row.try_get("primary_order_cl_ord_id")?,
        updated_at: parse_timestamp(row.try_get("updated_at")?),
    })
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<OrderEvent, EngineError> {
    Ok(OrderEvent {
        session_id: row.try_get("session_id")?,
        execution_id: row.try_get("execution_id")?,
        exec_type: codec::exec_type_from_db(row.try_get::<String, _>("exec_type")?.as_str())?,
        order_status: codec::order_status_from_db(row.try_get::<String, _>("order_status")?.as_str())?,
        cl_ord_id: row.try_get("cl_ord_id")?,
        orig_cl_ord_id: row.try_get("orig_cl_ord_id")?,
        venue_order_id: row.try_get("venue_order_id")?,
        symbol: row.try_get("symbol")?,
        side: row.try_get("side")?,
        ord_type: row.try_get("ord_type")?,
        time_in_force: row.try_get("time_in_force")?,
        order_qty: row.try_get::<String, _>("order_qty")?.parse().unwrap_or_default(),
        last_qty: codec::decimal_from_db(row.try_get("last_qty")?)?,
        cum_qty: codec::decimal_from_db(row.try_get("cum_qty")?)?,
        leaves_qty: codec::decimal_from_db(row.try_get("leaves_qty")?)?,
        price: codec::decimal_from_db(row.try_get("price")?)?,
        stop_px: codec::decimal_from_db(row.try_get("stop_px")?)?,
        last_px: codec::decimal_from_db(row.try_get("last_px")?)?,
        avg_px: codec::decimal_from_db(row.try_get("avg_px")?)?,
        account: row.try_get("account")?,
        ex_destination: row.try_get("ex_destination")?,
        quote_req_id: row.try_get("quote_req_id")?,
        transact_time: row
            .try_get::<Option<String>, _>("transact_time")?
            .map(|s| parse_timestamp(s)),
        text: row.try_get("text")?,
        ingested_at: parse_timestamp(row.try_get("ingested_at")?),
        raw: row.try_get("raw")?,
    })
}

fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account, EngineError> {
    Ok(Account {
        id: row.try_get("id")?,
        account_number: row.try_get("account_number")?,
        broker: row.try_get("broker")?,
        account_type: codec::account_type_from_db(row.try_get::<String, _>("account_type")?.as_str())?,
        active: row.try_get("active")?,
        strategy_key: row.try_get("strategy_key")?,
    })
}

fn row_to_route(row: &sqlx::sqlite::SqliteRow) -> Result<Route, EngineError> {
    Ok(Route {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        broker: row.try_get("broker")?,
        priority: row.try_get("priority")?,
        active: row.try_get("active")?,
        locate_type: codec::locate_type_from_db(row.try_get("locate_type")?)?,
    })
}

fn row_to_copy_rule(row: &sqlx::sqlite::SqliteRow) -> Result<CopyRule, EngineError> {
    Ok(CopyRule {
        id: row.try_get("id")?,
        primary_account: row.try_get("primary_account")?,
        shadow_account: row.try_get("shadow_account")?,
        ratio_type: codec::ratio_type_from_db(row.try_get::<String, _>("ratio_type")?.as_str())?,
        ratio_value: row
            .try_get::<String, _>("ratio_value")?
            .parse()
            .map_err(|_| EngineError::Fatal("corrupt ratio_value in store".into()))?,
        accepted_order_types: codec::order_type_set_from_db(row.try_get("accepted_order_types")?),
        copy_route: row.try_get("copy_route")?,
        locate_route: row.try_get("locate_route")?,
        min_quantity: codec::decimal_from_db(row.try_get("min_quantity")?)?,
        max_quantity: codec::decimal_from_db(row.try_get("max_quantity")?)?,
        priority: row.try_get("priority")?,
        active: row.try_get("active")?,
        config: row
            .try_get::<String, _>("config")?
            .parse()
            .unwrap_or(serde_json::Value::Null),
    })
}

fn parse_timestamp(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
