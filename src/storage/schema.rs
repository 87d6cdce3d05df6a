pub const SCHEMA: &str = r#"
-- air quality history, append-only
CREATE TABLE IF NOT EXISTS historico_aqi (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    latitude TEXT NOT NULL,
    longitude TEXT NOT NULL,
    indice_aqi INTEGER NOT NULL,
    risco TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_historico_coords_ts ON historico_aqi(latitude, longitude, timestamp);
CREATE INDEX IF NOT EXISTS idx_historico_ts ON historico_aqi(timestamp DESC);

-- alert subscribers
CREATE TABLE IF NOT EXISTS inscritos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    latitude TEXT NOT NULL,
    longitude TEXT NOT NULL,
    ultimo_alerta TEXT
);

CREATE INDEX IF NOT EXISTS idx_inscritos_coords ON inscritos(latitude, longitude);
"#;
