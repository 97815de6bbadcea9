//! Database schema.

pub(crate) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subject TEXT NOT NULL,
    subject_id INTEGER,
    kind TEXT NOT NULL,
    due_at INTEGER NOT NULL,
    claimed INTEGER NOT NULL DEFAULT 0,
    interval_seconds INTEGER
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_key ON jobs(subject, IFNULL(subject_id, 0), kind);
CREATE INDEX IF NOT EXISTS idx_jobs_due ON jobs(due_at);

CREATE TABLE IF NOT EXISTS sprints (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    guild INTEGER NOT NULL,
    channel INTEGER NOT NULL,
    start_at INTEGER NOT NULL,
    end_at INTEGER NOT NULL,
    end_reference INTEGER NOT NULL,
    length INTEGER NOT NULL,
    creator INTEGER NOT NULL,
    created INTEGER NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_sprints_active ON sprints(guild) WHERE completed = 0;

CREATE TABLE IF NOT EXISTS sprint_users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sprint INTEGER NOT NULL,
    user INTEGER NOT NULL,
    starting_wc INTEGER NOT NULL DEFAULT 0,
    current_wc INTEGER NOT NULL DEFAULT 0,
    ending_wc INTEGER NOT NULL DEFAULT 0,
    timejoined INTEGER NOT NULL,
    sprint_type TEXT NOT NULL DEFAULT 'normal',
    project INTEGER,
    UNIQUE (sprint, user)
);
CREATE INDEX IF NOT EXISTS idx_sprint_users_user ON sprint_users(user);

CREATE TABLE IF NOT EXISTS user_xp (
    user INTEGER PRIMARY KEY,
    xp INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS user_stats (
    user INTEGER NOT NULL,
    name TEXT NOT NULL,
    value INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user, name)
);

CREATE TABLE IF NOT EXISTS user_records (
    user INTEGER NOT NULL,
    record TEXT NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (user, record)
);

CREATE TABLE IF NOT EXISTS user_settings (
    user INTEGER NOT NULL,
    setting TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (user, setting)
);

CREATE TABLE IF NOT EXISTS guild_settings (
    guild INTEGER NOT NULL,
    setting TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (guild, setting)
);

CREATE TABLE IF NOT EXISTS sprint_subscribers (
    guild INTEGER NOT NULL,
    user INTEGER NOT NULL,
    PRIMARY KEY (guild, user)
);

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user INTEGER NOT NULL,
    shortname TEXT NOT NULL,
    name TEXT NOT NULL,
    words INTEGER NOT NULL DEFAULT 0,
    UNIQUE (user, shortname)
);

CREATE TABLE IF NOT EXISTS user_goals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user INTEGER NOT NULL,
    type TEXT NOT NULL,
    goal INTEGER NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0,
    completed INTEGER NOT NULL DEFAULT 0,
    reset INTEGER NOT NULL,
    UNIQUE (user, type)
);
CREATE INDEX IF NOT EXISTS idx_user_goals_reset ON user_goals(reset);

CREATE TABLE IF NOT EXISTS user_goals_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user INTEGER NOT NULL,
    type TEXT NOT NULL,
    date TEXT NOT NULL,
    goal INTEGER NOT NULL,
    result INTEGER NOT NULL,
    completed INTEGER NOT NULL
);
";
