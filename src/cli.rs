use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "invoice-ai")]
#[command(about = "請求書画像AI解析・Excel出力・Google Drive保存ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 請求書画像を解析してレポートJSONを出力
    Analyze {
        /// 画像ファイルまたはフォルダ（指定順に取り込む）
        #[arg(required_unless_present = "resume")]
        inputs: Vec<PathBuf>,

        /// 全画像を1件の請求書のページとして解析
        #[arg(short, long)]
        merge: bool,

        /// 出力JSONファイル（デフォルト: invoice-report.json）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 既存レポートから再開（未解析・失敗のみ再解析）
        #[arg(long)]
        resume: Option<PathBuf>,

        /// キャッシュを使用（同じ画像の再解析をスキップ）
        #[arg(long)]
        use_cache: bool,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,
    },

    /// レポートからExcelを生成
    Export {
        /// 入力レポートJSON
        #[arg(required = true)]
        input: PathBuf,

        /// 出力ファイル/ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// レポートの解析結果を Google Drive / Sheets に保存
    Upload {
        /// 入力レポートJSON
        #[arg(required = true)]
        input: PathBuf,

        /// 確認を省略
        #[arg(short, long)]
        yes: bool,
    },

    /// 解析からExcel出力（任意でクラウド保存）まで一括実行
    Run {
        /// 画像ファイルまたはフォルダ
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// 全画像を1件の請求書のページとして解析
        #[arg(short, long)]
        merge: bool,

        /// 出力ディレクトリ/ファイル（デフォルト: カレント）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 解析後に Google Drive / Sheets にも保存
        #[arg(long)]
        upload: bool,

        /// キャッシュを使用（同じ画像の再解析をスキップ）
        #[arg(long)]
        use_cache: bool,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,

        /// 確認を省略
        #[arg(short, long)]
        yes: bool,
    },

    /// 設定を表示/編集
    Config {
        /// Gemini APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// Google OAuth クライアントJSONのパスを設定
        #[arg(long)]
        set_client_secret: Option<PathBuf>,

        /// 通貨コードを設定（例: SAR）
        #[arg(long)]
        set_currency: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// 保存済みの Google トークンを削除
    Logout,

    /// 抽出キャッシュ管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,
    },
}
