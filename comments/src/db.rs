use lambda_runtime::tracing;
use openssl::error::ErrorStack;
use openssl::ssl::{SslConnector, SslMethod};
use postgres_openssl::MakeTlsConnector;
use tokio_postgres::Client;

use crate::comment::{Comment, NewComment};
use crate::error::HandlerError;
use crate::Config;

const SELECT_ALL: &str = "SELECT id, story_id, author, text, \
     to_char(created_at, 'DD Mon') AS date \
     FROM comments ORDER BY created_at DESC";

const SELECT_BY_STORY: &str = "SELECT id, story_id, author, text, \
     to_char(created_at, 'DD Mon') AS date \
     FROM comments WHERE story_id = $1 ORDER BY created_at DESC";

const INSERT: &str = "INSERT INTO comments (story_id, author, text) VALUES ($1, $2, $3) \
     RETURNING id, story_id, author, text, to_char(created_at, 'DD Mon') AS date";

/// Opens one store per invocation. The store is released when dropped.
pub(crate) trait Connector {
    type Store: CommentStore;

    async fn connect(&self) -> Result<Self::Store, HandlerError>;
}

pub(crate) trait CommentStore {
    /// Comments newest first, optionally restricted to one story.
    async fn list(&self, story_id: Option<i32>) -> Result<Vec<Comment>, HandlerError>;

    async fn insert(&self, comment: &NewComment) -> Result<Comment, HandlerError>;
}

pub(crate) struct PgConnector {
    database_url: String,
    tls: MakeTlsConnector,
}

impl PgConnector {
    /// Root certificates come from OpenSSL's default paths, which honor
    /// `SSL_CERT_FILE` and `SSL_CERT_DIR`.
    pub(crate) fn new(config: &Config) -> Result<Self, ErrorStack> {
        let builder = SslConnector::builder(SslMethod::tls())?;

        Ok(PgConnector {
            database_url: config.database_url.clone(),
            tls: MakeTlsConnector::new(builder.build()),
        })
    }
}

impl Connector for PgConnector {
    type Store = PgStore;

    async fn connect(&self) -> Result<PgStore, HandlerError> {
        let (client, connection) =
            tokio_postgres::connect(&self.database_url, self.tls.clone()).await?;

        // The connection task ends once the client is dropped.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "connection error");
            }
        });

        Ok(PgStore { client })
    }
}

pub(crate) struct PgStore {
    client: Client,
}

impl CommentStore for PgStore {
    async fn list(&self, story_id: Option<i32>) -> Result<Vec<Comment>, HandlerError> {
        let rows = match story_id {
            Some(story_id) => self.client.query(SELECT_BY_STORY, &[&story_id]).await?,
            None => self.client.query(SELECT_ALL, &[]).await?,
        };

        let comments = rows
            .iter()
            .map(Comment::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    async fn insert(&self, comment: &NewComment) -> Result<Comment, HandlerError> {
        let row = self
            .client
            .query_one(INSERT, &[&comment.story_id, &comment.author, &comment.text])
            .await?;

        Ok(Comment::try_from(&row)?)
    }
}
