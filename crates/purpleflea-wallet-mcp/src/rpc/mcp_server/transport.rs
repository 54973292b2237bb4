use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt as _};

/// Write one newline-delimited JSON frame and flush it.
pub async fn write_frame<W, T>(out: &mut W, v: &T) -> eyre::Result<()>
where
    W: AsyncWrite + Unpin + Send,
    T: Serialize + Sync,
{
    let mut frame = serde_json::to_vec(v)?;
    frame.push(b'\n');
    out.write_all(&frame).await?;
    out.flush().await?;
    Ok(())
}
