// Named SQL statements, prepared once per connection via the statement cache.

pub const CREATE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS stock_prices (
        stock_no TEXT NOT NULL,
        date TEXT NOT NULL,
        volume INTEGER NOT NULL,
        turnover INTEGER NOT NULL,
        open_price TEXT,
        high_price TEXT,
        low_price TEXT,
        close_price TEXT,
        price_change TEXT NOT NULL DEFAULT '',
        transaction_count INTEGER NOT NULL,
        PRIMARY KEY (stock_no, date)
    );
";

pub const UPSERT_BAR: &str = "
    INSERT OR REPLACE INTO stock_prices (
        stock_no, date, volume, turnover,
        open_price, high_price, low_price, close_price,
        price_change, transaction_count
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
";

pub const SELECT_RANGE: &str = "
    SELECT stock_no, date, volume, turnover, open_price, high_price,
           low_price, close_price, price_change, transaction_count
    FROM stock_prices
    WHERE stock_no = ?1 AND date >= ?2 AND date <= ?3
    ORDER BY date ASC
";

pub const SELECT_ALL: &str = "
    SELECT stock_no, date, volume, turnover, open_price, high_price,
           low_price, close_price, price_change, transaction_count
    FROM stock_prices
    WHERE stock_no = ?1
    ORDER BY date ASC
";

pub const SELECT_LATEST: &str = "
    SELECT stock_no, date, volume, turnover, open_price, high_price,
           low_price, close_price, price_change, transaction_count
    FROM stock_prices
    WHERE stock_no = ?1
    ORDER BY date DESC
    LIMIT ?2
";

pub const MAX_DATE: &str = "SELECT MAX(date) FROM stock_prices WHERE stock_no = ?1";

pub const INSTRUMENT_STATS: &str = "
    SELECT MIN(date), MAX(date), COUNT(*),
           MIN(CAST(close_price AS REAL)),
           MAX(CAST(close_price AS REAL)),
           AVG(CAST(close_price AS REAL))
    FROM stock_prices
    WHERE stock_no = ?1
";

pub const SUMMARIES: &str = "
    SELECT stock_no, MIN(date), MAX(date), COUNT(*),
           MIN(CAST(close_price AS REAL)),
           MAX(CAST(close_price AS REAL))
    FROM stock_prices
    GROUP BY stock_no
    ORDER BY stock_no
";
