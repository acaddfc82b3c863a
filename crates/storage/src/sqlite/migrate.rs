use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            role TEXT NOT NULL CHECK (role IN ('student', 'admin'))
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS notes (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS content (
            id INTEGER PRIMARY KEY,
            kind TEXT NOT NULL,
            owner_id TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY,
            owner_id TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS course_content (
            course_id INTEGER NOT NULL,
            content_id INTEGER NOT NULL,
            item_order INTEGER NOT NULL CHECK (item_order >= 0),
            PRIMARY KEY (course_id, content_id),
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE,
            FOREIGN KEY (content_id) REFERENCES content(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS enrollments (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            course_id INTEGER NOT NULL,
            enrolled_at TEXT NOT NULL,
            completed_at TEXT,
            progress REAL NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
            UNIQUE (user_id, course_id),
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS progress (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            content_id INTEGER NOT NULL,
            progress REAL NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
            time_spent INTEGER NOT NULL DEFAULT 0 CHECK (time_spent >= 0),
            completed INTEGER NOT NULL DEFAULT 0 CHECK (completed IN (0, 1)),
            completed_at TEXT,
            last_accessed TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (user_id, content_id),
            FOREIGN KEY (content_id) REFERENCES content(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quizzes (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            content_id INTEGER,
            course_id INTEGER,
            status TEXT NOT NULL CHECK (status IN ('draft', 'published')),
            passing_score REAL NOT NULL CHECK (passing_score BETWEEN 0 AND 100),
            time_limit INTEGER CHECK (time_limit > 0),
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (content_id) REFERENCES content(id) ON DELETE CASCADE,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_questions (
            id INTEGER PRIMARY KEY,
            quiz_id INTEGER NOT NULL,
            question TEXT NOT NULL,
            options TEXT NOT NULL,
            correct_answer INTEGER NOT NULL CHECK (correct_answer >= 0),
            points INTEGER NOT NULL CHECK (points >= 1),
            question_order INTEGER NOT NULL CHECK (question_order >= 1),
            UNIQUE (quiz_id, question_order),
            FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_attempts (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            quiz_id INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            answers TEXT,
            score INTEGER,
            max_score INTEGER,
            percentage REAL CHECK (percentage BETWEEN 0 AND 100),
            passed INTEGER CHECK (passed IN (0, 1)),
            completed_at TEXT,
            FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_course_content_content
            ON course_content (content_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_enrollments_user_enrolled
            ON enrollments (user_id, enrolled_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_progress_user_accessed
            ON progress (user_id, last_accessed);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quizzes_content ON quizzes (content_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quizzes_course ON quizzes (course_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quiz_attempts_user_started
            ON quiz_attempts (user_id, started_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_notes_user ON notes (user_id);
    ",
];

/// Applies versioned schema migrations, each inside its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    for (version, statements) in [(1_i64, SCHEMA_V1)] {
        if is_applied(pool, version).await? {
            continue;
        }
        let mut tx = pool.begin().await?;
        for statement in statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        tracing::info!(version, "applied schema migration");
    }

    Ok(())
}
