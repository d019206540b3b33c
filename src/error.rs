use thiserror::Error;

pub use color_eyre::eyre::eyre;

use crate::constant::DbFlavor;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The server reported an error for a command or during the handshake.
    #[error("Server error {}: {diagnostics}", .code.raw())]
    Server {
        code: ServerCode,
        diagnostics: Diagnostics,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad config: {0}")]
    BadConfig(String),

    /// A packet arrived with an unexpected sequence number.
    #[error("Sequence number mismatch: expected {expected}, got {actual}")]
    SequenceNumberMismatch { expected: u8, actual: u8 },

    /// A deserializer ran out of bytes before the last field of a packet.
    #[error("Incomplete message")]
    IncompleteMessage,

    /// A fixed-layout packet carried bytes past its last field.
    #[error("Extra bytes at the end of a message")]
    ExtraBytes,

    /// A field held a value the protocol does not allow.
    #[error("Protocol value error")]
    ProtocolValueError,

    /// The server is too old or lacks a mandatory capability.
    #[error("Server does not support the minimum required capabilities")]
    ServerUnsupported,

    /// TLS was required but the server does not advertise CLIENT_SSL.
    #[error("Server does not support TLS")]
    SslUnsupported,

    /// The server requested an authentication plugin this client does not implement.
    #[error("Unknown authentication plugin: {0}")]
    UnknownAuthPlugin(String),

    /// The active authentication plugin refuses to run over a plaintext channel.
    #[error("The authentication plugin requires a TLS connection")]
    AuthPluginRequiresSsl,

    /// `execute` was called with a parameter count different from the statement's.
    #[error("Wrong number of parameters: statement takes {expected}, got {actual}")]
    WrongNumParams { expected: u16, actual: usize },

    /// The command produced a different number of resultsets than the
    /// caller's shape declaration expects.
    #[error("Mismatch in the number of resultsets")]
    NumResultsetsMismatch,

    /// A resultset's metadata does not satisfy the caller's declared row
    /// shape.
    #[error("Metadata check failed: {0}")]
    MetadataCheckFailed(String),

    #[error("A bug in quill-mysql: {0}")]
    LibraryBug(color_eyre::Report),
}

impl Error {
    pub fn from_debug(err: impl std::fmt::Debug) -> Self {
        Self::LibraryBug(eyre!(format!("{:#?}", err)))
    }

    /// The diagnostics bundle, if this error carries one.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::Server { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }

    /// The server error code, if this error came from the server.
    pub fn server_code(&self) -> Option<ServerCode> {
        match self {
            Self::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<core::convert::Infallible> for Error {
    fn from(err: core::convert::Infallible) -> Self {
        match err {}
    }
}

impl<Src, Dst: ?Sized> From<zerocopy::CastError<Src, Dst>> for Error {
    fn from(err: zerocopy::CastError<Src, Dst>) -> Self {
        Self::LibraryBug(eyre!("{:#?}", err))
    }
}

/// Server-supplied context for an error: the human-readable message and the
/// five-character SQL state, when the server provided them.
///
/// Client-side errors carry an empty bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    message: String,
    sql_state: String,
}

impl Diagnostics {
    pub(crate) fn new(message: String, sql_state: String) -> Self {
        Self { message, sql_state }
    }

    /// The error message as sent by the server. Empty for client-side errors.
    pub fn server_message(&self) -> &str {
        &self.message
    }

    /// The SQL state, e.g. `"42S02"`. Empty when the server omitted it.
    pub fn sql_state(&self) -> &str {
        &self.sql_state
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.sql_state.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "({}) {}", self.sql_state, self.message)
        }
    }
}

/// A server error code, partitioned so callers can match portably.
///
/// Codes shared between MySQL and MariaDB are strongly typed; codes specific
/// to one flavor are passed through numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerCode {
    Common(CommonServerError),
    Mysql(u16),
    Mariadb(u16),
}

impl ServerCode {
    /// Classify a raw error code reported by a server of the given flavor.
    pub(crate) fn from_raw(code: u16, flavor: DbFlavor) -> Self {
        match CommonServerError::from_code(code) {
            Some(common) => Self::Common(common),
            None => match flavor {
                DbFlavor::Mysql => Self::Mysql(code),
                DbFlavor::Mariadb => Self::Mariadb(code),
            },
        }
    }

    /// The original numeric value of the code.
    pub fn raw(&self) -> u16 {
        match self {
            Self::Common(c) => *c as u16,
            Self::Mysql(c) | Self::Mariadb(c) => *c,
        }
    }
}

macro_rules! common_server_errors {
    ($($name:ident = $code:literal,)*) => {
        /// Error codes in the range shared between MySQL and MariaDB.
        ///
        /// The shared range has holes where codes were retired, so conversion
        /// from a raw code is fallible.
        #[repr(u16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[non_exhaustive]
        pub enum CommonServerError {
            $($name = $code,)*
        }

        impl CommonServerError {
            pub fn from_code(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(Self::$name),)*
                    _ => None,
                }
            }
        }
    };
}

common_server_errors! {
    ErCantCreateTable = 1005,
    ErCantCreateDb = 1006,
    ErDbCreateExists = 1007,
    ErDbDropExists = 1008,
    ErOutOfMemory = 1037,
    ErConCountError = 1040,
    ErBadHostError = 1042,
    ErHandshakeError = 1043,
    ErDbaccessDeniedError = 1044,
    ErAccessDeniedError = 1045,
    ErNoDbError = 1046,
    ErUnknownComError = 1047,
    ErBadNullError = 1048,
    ErBadDbError = 1049,
    ErTableExistsError = 1050,
    ErBadTableError = 1051,
    ErNonUniqError = 1052,
    ErServerShutdown = 1053,
    ErBadFieldError = 1054,
    ErWrongFieldWithGroup = 1055,
    ErWrongValueCount = 1058,
    ErTooLongIdent = 1059,
    ErDupFieldname = 1060,
    ErDupKeyname = 1061,
    ErDupEntry = 1062,
    ErWrongFieldSpec = 1063,
    ErParseError = 1064,
    ErEmptyQuery = 1065,
    ErNonuniqTable = 1066,
    ErInvalidDefault = 1067,
    ErMultiplePriKey = 1068,
    ErTooManyKeys = 1069,
    ErTooLongKey = 1071,
    ErKeyColumnDoesNotExits = 1072,
    ErBlobUsedAsKey = 1073,
    ErTooBigFieldlength = 1074,
    ErWrongAutoKey = 1075,
    ErForcingClose = 1080,
    ErIpsockError = 1081,
    ErNoSuchIndex = 1082,
    ErWrongFieldTerminators = 1083,
    ErBlobsAndNoTerminated = 1084,
    ErCantRemoveAllFields = 1090,
    ErCantDropFieldOrKey = 1091,
    ErBlobCantHaveDefault = 1101,
    ErWrongDbName = 1102,
    ErWrongTableName = 1103,
    ErUnknownProcedure = 1106,
    ErWrongParamcountToProcedure = 1107,
    ErUnknownTable = 1109,
    ErFieldSpecifiedTwice = 1110,
    ErUnsupportedExtension = 1112,
    ErTableMustHaveColumns = 1113,
    ErUnknownCharacterSet = 1115,
    ErTooBigRowsize = 1118,
    ErWrongOuterJoin = 1120,
    ErNullColumnInIndex = 1121,
    ErPasswordAnonymousUser = 1131,
    ErPasswordNotAllowed = 1132,
    ErPasswordNoMatch = 1133,
    ErWrongValueCountOnRow = 1136,
    ErInvalidUseOfNull = 1138,
    ErRegexpError = 1139,
    ErMixOfGroupFuncAndFields = 1140,
    ErNonexistingGrant = 1141,
    ErTableaccessDeniedError = 1142,
    ErColumnaccessDeniedError = 1143,
    ErIllegalGrantForTable = 1144,
    ErGrantWrongHostOrUser = 1145,
    ErNoSuchTable = 1146,
    ErNonexistingTableGrant = 1147,
    ErNotAllowedCommand = 1148,
    ErSyntaxError = 1149,
    ErAbortingConnection = 1152,
    ErNetPacketTooLarge = 1153,
    ErNetReadErrorFromPipe = 1154,
    ErNetFcntlError = 1155,
    ErNetPacketsOutOfOrder = 1156,
    ErNetUncompressError = 1157,
    ErNetReadError = 1158,
    ErNetReadInterrupted = 1159,
    ErNetErrorOnWrite = 1160,
    ErNetWriteInterrupted = 1161,
    ErTooLongString = 1162,
    ErTableCantHandleBlob = 1163,
    ErTableCantHandleAutoIncrement = 1164,
    ErWrongColumnName = 1166,
    ErWrongKeyColumn = 1167,
    ErDupUnique = 1169,
    ErBlobKeyWithoutLength = 1170,
    ErPrimaryCantHaveNull = 1171,
    ErTooManyRows = 1172,
    ErRequiresPrimaryKey = 1173,
    ErUpdateWithoutKeyInSafeMode = 1175,
    ErKeyDoesNotExits = 1176,
    ErCheckNoSuchTable = 1177,
    ErCheckNotImplemented = 1178,
    ErCantDoThisDuringAnTransaction = 1179,
    ErErrorDuringCommit = 1180,
    ErErrorDuringRollback = 1181,
    ErNewAbortingConnection = 1184,
    ErMasterNetRead = 1189,
    ErMasterNetWrite = 1190,
    ErTooManyUserConnections = 1203,
    ErLockWaitTimeout = 1205,
    ErLockTableFull = 1206,
    ErReadOnlyTransaction = 1207,
    ErWrongArguments = 1210,
    ErNoPermissionToCreateUser = 1211,
    ErLockDeadlock = 1213,
    ErNoReferencedRow = 1216,
    ErRowIsReferenced = 1217,
    ErConnectToMaster = 1218,
    ErWrongNumberOfColumnsInSelect = 1222,
    ErUserLimitReached = 1226,
    ErSpecificAccessDeniedError = 1227,
    ErNoDefault = 1230,
    ErWrongValueForVar = 1231,
    ErWrongTypeForVar = 1232,
    ErSpNoRecursiveCreate = 1303,
    ErSpAlreadyExists = 1304,
    ErSpDoesNotExist = 1305,
    ErSpWrongNoOfArgs = 1318,
    ErCannotUser = 1396,
    ErXaerNota = 1397,
    ErXaerInval = 1398,
    ErXaerRmfail = 1399,
    ErXaerOutside = 1400,
    ErXaerRmerr = 1401,
    ErXaRbrollback = 1402,
    ErNonexistingProcGrant = 1403,
    ErDataTooLong = 1406,
    ErSpNotVarArg = 1414,
    ErDupArgument = 1418,
    ErTooManyConcurrentTrxs = 1637,
}
