use anyhow::Result;
use sqlx::PgPool;

/// Create the ledger tables if they do not exist yet
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing PostgreSQL schema...");

    for (name, ddl) in [
        ("customers", CREATE_CUSTOMERS_TABLE),
        ("accounts", CREATE_ACCOUNTS_TABLE),
        ("transactions", CREATE_TRANSACTIONS_TABLE),
        ("transactions indexes", CREATE_TRANSACTIONS_INDEXES),
        ("transfer_outbox", CREATE_OUTBOX_TABLE),
        ("processed_events", CREATE_PROCESSED_EVENTS_TABLE),
    ] {
        sqlx::raw_sql(ddl)
            .execute(pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", name, e))?;
    }

    tracing::info!("PostgreSQL schema initialized successfully");
    Ok(())
}

pub const CREATE_CUSTOMERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(200) NOT NULL,
    customer_type   VARCHAR(20) NOT NULL DEFAULT 'individual',
    personal_id     VARCHAR(20) UNIQUE,
    business_number VARCHAR(20) UNIQUE,
    vip_tier        VARCHAR(20),
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

pub const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id             BIGSERIAL PRIMARY KEY,
    customer_id    BIGINT NOT NULL REFERENCES customers(id),
    account_number VARCHAR(30) NOT NULL UNIQUE,
    account_type   VARCHAR(20) NOT NULL DEFAULT 'checking',
    currency       CHAR(3) NOT NULL DEFAULT 'ILS',
    balance        NUMERIC(15, 2) NOT NULL DEFAULT 0 CHECK (balance >= 0),
    status         VARCHAR(20) NOT NULL DEFAULT 'active',
    created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

pub const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id                  BIGSERIAL PRIMARY KEY,
    transfer_id         BIGINT NOT NULL UNIQUE,
    from_account_id     BIGINT NOT NULL REFERENCES accounts(id),
    to_account_id       BIGINT NOT NULL REFERENCES accounts(id),
    from_balance_before NUMERIC(15, 2) NOT NULL,
    from_balance_after  NUMERIC(15, 2) NOT NULL,
    to_balance_before   NUMERIC(15, 2) NOT NULL,
    to_balance_after    NUMERIC(15, 2) NOT NULL,
    amount              NUMERIC(15, 2) NOT NULL CHECK (amount > 0),
    currency            CHAR(3) NOT NULL,
    description         TEXT,
    status              VARCHAR(20) NOT NULL DEFAULT 'pending',
    processed_by        VARCHAR(100) NOT NULL,
    source              VARCHAR(50) NOT NULL,
    error_message       TEXT,
    timestamp           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CHECK (from_account_id <> to_account_id)
)
"#;

pub const CREATE_TRANSACTIONS_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_transactions_from ON transactions(from_account_id, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_transactions_to ON transactions(to_account_id, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_transactions_status ON transactions(status)
"#;

pub const CREATE_OUTBOX_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transfer_outbox (
    id          BIGSERIAL PRIMARY KEY,
    transfer_id BIGINT NOT NULL,
    topic       VARCHAR(100) NOT NULL,
    payload     TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    sent_at     TIMESTAMPTZ
);
CREATE INDEX IF NOT EXISTS idx_outbox_unsent ON transfer_outbox(created_at) WHERE sent_at IS NULL
"#;

pub const CREATE_PROCESSED_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS processed_events (
    event_key    VARCHAR(100) PRIMARY KEY,
    processed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;
